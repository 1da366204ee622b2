pub mod error;
pub mod types;

pub use error::{RedditError, Result};
pub use types::{flatten_comments, Child, Comment, Listing, ListingData, Submission};

use std::time::{Duration, Instant};

use rand::Rng;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const BASE_URL: &str = "https://www.reddit.com";
const USER_AGENT: &str = "moodwire/0.1 (research crawler)";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Self-imposed ceiling on outbound requests, independent of any 429s the
/// server sends.
const MAX_REQUESTS_PER_MINUTE: u64 = 60;

/// Read-API client for the link-aggregation site. Same retry contract as
/// the imageboard client: 429 honors Retry-After, 404 and retry exhaustion
/// both surface as `Ok(None)`.
pub struct RedditClient {
    client: reqwest::Client,
    base_url: String,
    max_attempts: u32,
    backoff_base: Duration,
    min_request_gap: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RedditClient {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: BASE_URL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            min_request_gap: Duration::from_secs_f64(60.0 / MAX_REQUESTS_PER_MINUTE as f64),
            last_request: Mutex::new(None),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, max_attempts: u32, backoff_base: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.backoff_base = backoff_base;
        self
    }

    /// Override the outbound requests-per-minute ceiling.
    pub fn with_rate_limit(mut self, requests_per_minute: u64) -> Self {
        self.min_request_gap =
            Duration::from_secs_f64(60.0 / requests_per_minute.max(1) as f64);
        self
    }

    /// Fetch the newest submissions in a subreddit.
    pub async fn fetch_new_posts(
        &self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Option<Vec<Submission>>> {
        if subreddit.is_empty() {
            return Err(RedditError::InvalidInput("subreddit must be non-empty".into()));
        }
        let url = format!("{}/r/{}/new.json?limit={}", self.base_url, subreddit, limit);
        let listing: Option<Listing> = self.get_json(&url).await?;

        Ok(listing.map(|l| {
            l.data
                .children
                .iter()
                .filter(|c| c.kind == "t3")
                .filter_map(|c| match serde_json::from_value::<Submission>(c.data.clone()) {
                    Ok(sub) => Some(sub),
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed submission");
                        None
                    }
                })
                .collect()
        }))
    }

    /// Fetch and flatten the comment tree of a submission.
    pub async fn fetch_comments(
        &self,
        subreddit: &str,
        post_id: &str,
    ) -> Result<Option<Vec<Comment>>> {
        if subreddit.is_empty() || post_id.is_empty() {
            return Err(RedditError::InvalidInput(
                "subreddit and post_id must be non-empty".into(),
            ));
        }
        let url = format!(
            "{}/r/{}/comments/{}.json?limit=500",
            self.base_url, subreddit, post_id
        );

        // The comments endpoint returns a two-element array: the submission
        // listing, then the comment tree.
        let listings: Option<Vec<Listing>> = self.get_json(&url).await?;

        Ok(listings.map(|ls| {
            ls.get(1)
                .map(|l| flatten_comments(&l.data.children))
                .unwrap_or_default()
        }))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        for attempt in 0..self.max_attempts {
            self.throttle().await;
            debug!(url, attempt, "Requesting");

            let resp = match self.client.get(url).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(url, attempt, error = %e, "Request error");
                    self.backoff(attempt).await;
                    continue;
                }
            };

            let status = resp.status();

            if status.as_u16() == 429 {
                let wait = resp
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(DEFAULT_RETRY_AFTER);
                warn!(url, wait_secs = wait.as_secs(), "Rate limited, waiting");
                tokio::time::sleep(wait).await;
                continue;
            }

            if status.as_u16() == 404 {
                warn!(url, "404 Not Found");
                return Ok(None);
            }

            if !status.is_success() {
                warn!(url, status = status.as_u16(), attempt, "Upstream error");
                self.backoff(attempt).await;
                continue;
            }

            let body = resp.text().await.unwrap_or_default();
            if body.is_empty() || body == "null" {
                warn!(url, "Empty response body");
                return Ok(None);
            }

            return match serde_json::from_str::<T>(&body) {
                Ok(parsed) => Ok(Some(parsed)),
                Err(e) => {
                    warn!(url, error = %e, "JSON parse error");
                    Ok(None)
                }
            };
        }

        warn!(url, attempts = self.max_attempts, "Retries exhausted");
        Ok(None)
    }

    /// Hold the request until the calls-per-minute floor has elapsed since
    /// the previous one. Applies to every outbound request, retries
    /// included; the lock serializes the gate across concurrent callers.
    async fn throttle(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_request_gap {
                tokio::time::sleep(self.min_request_gap - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn backoff(&self, attempt: u32) {
        if attempt + 1 >= self.max_attempts {
            return;
        }
        let delay = self.backoff_base * 2u32.saturating_pow(attempt);
        let jitter = Duration::from_millis(rand::rng().random_range(0..250));
        tokio::time::sleep(delay + jitter).await;
    }
}

impl Default for RedditClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::routing::get;
    use axum::Router;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn new_posts_parses_t3_children_only() {
        let router = Router::new().route(
            "/r/test/new.json",
            get(|| async {
                r#"{"kind": "Listing", "data": {"children": [
                    {"kind": "t3", "data": {"id": "p1", "title": "one", "score": 10}},
                    {"kind": "t5", "data": {"name": "a community"}},
                    {"kind": "t3", "data": {"id": "p2", "title": "two"}}
                ]}}"#
            }),
        );
        let base = serve(router).await;

        let posts = RedditClient::new()
            .with_base_url(&base)
            .with_retry(2, Duration::from_millis(10))
            .fetch_new_posts("test", 25)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, "p1");
        assert_eq!(posts[0].score, 10);
        assert_eq!(posts[1].id, "p2");
    }

    #[tokio::test]
    async fn comments_come_from_second_listing() {
        let router = Router::new().route(
            "/r/test/comments/p1.json",
            get(|| async {
                r#"[
                    {"kind": "Listing", "data": {"children": [
                        {"kind": "t3", "data": {"id": "p1", "title": "one"}}]}},
                    {"kind": "Listing", "data": {"children": [
                        {"kind": "t1", "data": {"id": "c1", "body": "hi",
                                                "score": 2, "created_utc": 1.0,
                                                "replies": ""}}]}}
                ]"#
            }),
        );
        let base = serve(router).await;

        let comments = RedditClient::new()
            .with_base_url(&base)
            .with_retry(2, Duration::from_millis(10))
            .fetch_comments("test", "p1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].body, "hi");
    }

    #[tokio::test]
    async fn successive_requests_respect_the_rate_ceiling() {
        let router = Router::new().route(
            "/r/test/new.json",
            get(|| async { r#"{"kind": "Listing", "data": {"children": []}}"# }),
        );
        let base = serve(router).await;

        // 1200 requests/minute is a 50ms gap between calls.
        let client = RedditClient::new().with_base_url(&base).with_rate_limit(1200);
        let started = Instant::now();
        for _ in 0..3 {
            client.fetch_new_posts("test", 25).await.unwrap();
        }
        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
