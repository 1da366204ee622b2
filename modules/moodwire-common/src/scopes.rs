use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::MoodwireError;

/// Allow-list of communities under active crawling, loaded from JSON files
/// at orchestrator startup. A scope removed from the list causes in-flight
/// and future jobs for it to no-op rather than fail.
#[derive(Debug, Clone, Default)]
pub struct MonitoredScopes {
    pub boards: Vec<String>,
    pub subreddits: Vec<String>,
}

#[derive(Deserialize)]
struct BoardsFile {
    #[serde(default)]
    boards: Vec<String>,
}

#[derive(Deserialize)]
struct SubredditsFile {
    #[serde(default)]
    subreddits: Vec<String>,
}

impl MonitoredScopes {
    /// Load both allow-lists. A missing file yields an empty list for that
    /// platform; a malformed file is a configuration error.
    pub fn load(
        boards_path: impl AsRef<Path>,
        subreddits_path: impl AsRef<Path>,
    ) -> Result<Self, MoodwireError> {
        let boards = match fs::read_to_string(boards_path.as_ref()) {
            Ok(raw) => {
                let parsed: BoardsFile = serde_json::from_str(&raw).map_err(|e| {
                    MoodwireError::Config(format!(
                        "failed to parse {}: {e}",
                        boards_path.as_ref().display()
                    ))
                })?;
                parsed.boards
            }
            Err(_) => Vec::new(),
        };

        let subreddits = match fs::read_to_string(subreddits_path.as_ref()) {
            Ok(raw) => {
                let parsed: SubredditsFile = serde_json::from_str(&raw).map_err(|e| {
                    MoodwireError::Config(format!(
                        "failed to parse {}: {e}",
                        subreddits_path.as_ref().display()
                    ))
                })?;
                parsed.subreddits
            }
            Err(_) => Vec::new(),
        };

        info!(boards = ?boards, subreddits = ?subreddits, "Loaded monitored scopes");

        Ok(Self { boards, subreddits })
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty() && self.subreddits.is_empty()
    }

    pub fn has_board(&self, board: &str) -> bool {
        self.boards.iter().any(|b| b == board)
    }

    pub fn has_subreddit(&self, subreddit: &str) -> bool {
        self.subreddits.iter().any(|s| s == subreddit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_yield_empty_lists() {
        let scopes = MonitoredScopes::load("/nonexistent/a.json", "/nonexistent/b.json").unwrap();
        assert!(scopes.is_empty());
    }

    #[test]
    fn guards_match_exact_names_only() {
        let scopes = MonitoredScopes {
            boards: vec!["pol".to_string(), "news".to_string()],
            subreddits: vec!["politics".to_string()],
        };
        assert!(scopes.has_board("pol"));
        assert!(!scopes.has_board("po"));
        assert!(scopes.has_subreddit("politics"));
        assert!(!scopes.has_subreddit("Politics"));
    }
}
