use std::collections::HashSet;

/// Threads that were present in the previous catalog snapshot but are gone
/// from the current one. Those have fallen off the board and will never be
/// edited again, so they are safe to archive.
pub fn dead_threads(previous: &[u64], current: &[u64]) -> Vec<u64> {
    let current: HashSet<u64> = current.iter().copied().collect();
    let mut dead: Vec<u64> = previous
        .iter()
        .copied()
        .filter(|no| !current.contains(no))
        .collect();
    dead.sort_unstable();
    dead.dedup();
    dead
}
