/// Combine a title score, a body score, and child (comment) scores into one
/// aggregate: 40/30/30 when children exist, 60/40 otherwise. Clamped to
/// [-1, 1] after weighting even though in-range inputs cannot currently
/// exceed it; the clamp must survive weight changes.
pub fn aggregate(title_score: f64, body_score: f64, child_scores: &[f64]) -> f64 {
    let combined = if child_scores.is_empty() {
        0.6 * title_score + 0.4 * body_score
    } else {
        let child_mean = child_scores.iter().sum::<f64>() / child_scores.len() as f64;
        0.4 * title_score + 0.3 * body_score + 0.3 * child_mean
    };
    combined.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_with_children() {
        // mean of [1.0, -1.0] is 0.0
        let agg = aggregate(1.0, 1.0, &[1.0, -1.0]);
        assert!((agg - 0.7).abs() < 1e-9);
    }

    #[test]
    fn weights_without_children() {
        let agg = aggregate(1.0, -1.0, &[]);
        assert!((agg - 0.2).abs() < 1e-9);
    }

    #[test]
    fn extremes_stay_in_range() {
        assert_eq!(aggregate(1.0, 1.0, &[1.0]), 1.0);
        assert_eq!(aggregate(-1.0, -1.0, &[-1.0, -1.0]), -1.0);
    }
}
