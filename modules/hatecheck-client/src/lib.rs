pub mod error;

pub use error::{HatecheckError, Result};

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Self-imposed ceiling on outbound classification calls.
const MAX_REQUESTS_PER_MINUTE: u64 = 60;

/// Classifier verdict for a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// Flagged as hateful/toxic.
    Flag,
    /// Classified as normal speech.
    Normal,
}

/// A `(label, confidence)` pair from the classifier.
#[derive(Debug, Clone, Copy)]
pub struct Classification {
    pub label: Label,
    pub confidence: f64,
}

#[derive(Serialize)]
struct ModerateRequest<'a> {
    token: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct ModerateResponse {
    class: Option<String>,
    confidence: Option<serde_json::Value>,
}

/// Client for the external toxicity classifier. Each call is one POST with
/// a hard request timeout so a hung call cannot occupy a worker slot; retry
/// and cooldown policy belongs to the scoring layer, not here.
pub struct HatecheckClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    min_request_gap: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl HatecheckClient {
    pub fn new(endpoint: &str, token: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            endpoint: endpoint.to_string(),
            token: token.to_string(),
            min_request_gap: Duration::from_secs_f64(60.0 / MAX_REQUESTS_PER_MINUTE as f64),
            last_request: Mutex::new(None),
        }
    }

    /// Override the outbound requests-per-minute ceiling.
    pub fn with_rate_limit(mut self, requests_per_minute: u64) -> Self {
        self.min_request_gap =
            Duration::from_secs_f64(60.0 / requests_per_minute.max(1) as f64);
        self
    }

    /// Classify a piece of text. Any malformed response is an error for the
    /// caller to map to neutral.
    pub async fn classify(&self, text: &str) -> Result<Classification> {
        self.throttle().await;

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&ModerateRequest {
                token: &self.token,
                text,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(HatecheckError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ModerateResponse = resp
            .json()
            .await
            .map_err(|e| HatecheckError::Malformed(e.to_string()))?;

        let label = match body.class.as_deref() {
            Some("flag") => Label::Flag,
            Some("normal") => Label::Normal,
            other => {
                return Err(HatecheckError::Malformed(format!(
                    "unexpected class: {other:?}"
                )))
            }
        };

        // The API has been observed returning confidence as both a number
        // and a string; accept either.
        let confidence = match body.confidence {
            Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(serde_json::Value::String(s)) => s.parse().unwrap_or(0.0),
            _ => 0.0,
        };

        Ok(Classification { label, confidence })
    }

    /// Hold the call until the calls-per-minute floor has elapsed since the
    /// previous one; the lock serializes the gate across concurrent callers.
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
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::routing::post;
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
    async fn parses_flag_with_numeric_confidence() {
        let router = Router::new().route(
            "/moderate",
            post(|| async { r#"{"class": "flag", "confidence": 0.97}"# }),
        );
        let base = serve(router).await;

        let c = HatecheckClient::new(&format!("{base}/moderate"), "tok")
            .classify("some text")
            .await
            .unwrap();
        assert_eq!(c.label, Label::Flag);
        assert!((c.confidence - 0.97).abs() < 1e-9);
    }

    #[tokio::test]
    async fn parses_string_confidence() {
        let router = Router::new().route(
            "/moderate",
            post(|| async { r#"{"class": "normal", "confidence": "0.91"}"# }),
        );
        let base = serve(router).await;

        let c = HatecheckClient::new(&format!("{base}/moderate"), "tok")
            .classify("fine text")
            .await
            .unwrap();
        assert_eq!(c.label, Label::Normal);
        assert!((c.confidence - 0.91).abs() < 1e-9);
    }

    #[tokio::test]
    async fn successive_calls_respect_the_rate_ceiling() {
        let router = Router::new().route(
            "/moderate",
            post(|| async { r#"{"class": "normal", "confidence": 0.9}"# }),
        );
        let base = serve(router).await;

        // 1200 requests/minute is a 50ms gap between calls.
        let client =
            HatecheckClient::new(&format!("{base}/moderate"), "tok").with_rate_limit(1200);
        let started = std::time::Instant::now();
        for _ in 0..3 {
            client.classify("fine text").await.unwrap();
        }
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn unexpected_class_is_malformed() {
        let router = Router::new().route(
            "/moderate",
            post(|| async { r#"{"class": "gibberish", "confidence": 0.5}"# }),
        );
        let base = serve(router).await;

        let err = HatecheckClient::new(&format!("{base}/moderate"), "tok")
            .classify("text")
            .await
            .unwrap_err();
        assert!(matches!(err, HatecheckError::Malformed(_)));
    }
}
