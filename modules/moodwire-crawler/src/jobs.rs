use serde::{Deserialize, Serialize};

/// Queue lane for periodic board catalog polls.
pub const LANE_CATALOG: &str = "crawl-catalog";
/// Queue lane for archiving a single dead thread.
pub const LANE_THREAD: &str = "crawl-thread";
/// Queue lane for periodic subreddit sweeps.
pub const LANE_SUBREDDIT: &str = "crawl-subreddit";

/// Payload for a catalog poll. Carries the thread set seen on the previous
/// poll so the handler can diff without any state of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlCatalogJob {
    pub board: String,
    #[serde(default)]
    pub previous_threads: Vec<u64>,
}

/// Payload for archiving one thread that has fallen off its board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlThreadJob {
    pub board: String,
    pub thread_no: u64,
}

/// Payload for one subreddit sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSubredditJob {
    pub subreddit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_payload_defaults_previous_to_empty() {
        let job: CrawlCatalogJob = serde_json::from_str(r#"{"board":"g"}"#).unwrap();
        assert_eq!(job.board, "g");
        assert!(job.previous_threads.is_empty());
    }

    #[test]
    fn catalog_payload_round_trips() {
        let job = CrawlCatalogJob {
            board: "pol".into(),
            previous_threads: vec![1, 2, 3],
        };
        let value = serde_json::to_value(&job).unwrap();
        let back: CrawlCatalogJob = serde_json::from_value(value).unwrap();
        assert_eq!(back.previous_threads, vec![1, 2, 3]);
    }
}
