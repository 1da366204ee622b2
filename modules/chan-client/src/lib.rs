pub mod error;
pub mod types;

pub use error::{ChanError, Result};
pub use types::{thread_numbers, CatalogPage, CatalogThread, Post, Thread};

use std::time::{Duration, Instant};

use rand::Rng;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const BASE_URL: &str = "https://a.4cdn.org";
const USER_AGENT: &str = "moodwire/0.1 (research crawler)";
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Self-imposed ceiling on outbound requests, independent of any 429s the
/// server sends.
const MAX_REQUESTS_PER_MINUTE: u64 = 60;

/// Retry-After fallback when the server rate-limits without a usable header.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Read-API client for the imageboard. One outbound request per logical
/// call; a shared reqwest client keeps connections alive across calls.
pub struct ChanClient {
    client: reqwest::Client,
    base_url: String,
    max_attempts: u32,
    backoff_base: Duration,
    min_request_gap: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl ChanClient {
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

    /// Point the client at a different API host (tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Override the retry schedule (tests use a short base to stay fast).
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

    /// Fetch the catalog of currently active threads on a board.
    /// `Ok(None)` means the catalog is gone or unobtainable after retries.
    pub async fn fetch_catalog(&self, board: &str) -> Result<Option<Vec<CatalogPage>>> {
        if board.is_empty() {
            return Err(ChanError::InvalidInput("board must be non-empty".into()));
        }
        let url = format!("{}/{}/catalog.json", self.base_url, board);
        self.get_json(&url).await
    }

    /// Fetch a full thread. `Ok(None)` means the thread is gone (404) or
    /// unobtainable after retries.
    pub async fn fetch_thread(&self, board: &str, thread_no: u64) -> Result<Option<Thread>> {
        if board.is_empty() {
            return Err(ChanError::InvalidInput("board must be non-empty".into()));
        }
        if thread_no == 0 {
            return Err(ChanError::InvalidInput("thread_no must be positive".into()));
        }
        let url = format!("{}/{}/thread/{}.json", self.base_url, board, thread_no);
        self.get_json(&url).await
    }

    /// GET a JSON document with the full retry policy: 429 honors
    /// Retry-After, 404 is "gone" rather than an error, transient failures
    /// back off exponentially, and cap exhaustion returns None so the caller
    /// decides what absence means.
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

    /// Exponential backoff (base doubling per attempt) plus a small jitter.
    /// Skipped after the final attempt.
    async fn backoff(&self, attempt: u32) {
        if attempt + 1 >= self.max_attempts {
            return;
        }
        let delay = self.backoff_base * 2u32.saturating_pow(attempt);
        let jitter = Duration::from_millis(rand::rng().random_range(0..250));
        tokio::time::sleep(delay + jitter).await;
    }
}

impl Default for ChanClient {
    fn default() -> Self {
        Self::new()
    }
}
