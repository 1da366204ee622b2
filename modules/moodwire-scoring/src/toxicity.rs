use std::time::Duration;

use hatecheck_client::{HatecheckClient, Label};
use tracing::warn;

use crate::normalize::normalize;

/// Confidence below which the classifier verdict is treated as neutral.
pub const CONFIDENCE_THRESHOLD: f64 = 0.85;

/// How a score came to be. Keeps "neutral because the input had nothing to
/// score" distinguishable from "neutral because the classifier failed" —
/// the two look identical as bare values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// The classifier ran and this is its (possibly thresholded) verdict.
    Scored,
    /// Empty/non-text input; neutral by design.
    NeutralInput,
    /// Classifier call failed; defaulted to neutral.
    Defaulted,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreOutcome<T> {
    pub value: T,
    pub provenance: Provenance,
}

/// Toxicity scoring over the external classifier. Two contracts, one per
/// platform: a continuous confidence-scaled score on [-1, 1] and a discrete
/// {-1, 0, 1} classification.
pub struct ToxicityScorer {
    client: HatecheckClient,
    /// Sleep after a failed classifier call; soft local rate limiting.
    cooldown: Duration,
}

impl ToxicityScorer {
    pub fn new(client: HatecheckClient) -> Self {
        Self {
            client,
            cooldown: Duration::from_secs(1),
        }
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Continuous contract: Flag maps to -confidence, Normal to +confidence,
    /// below-threshold verdicts to 0.0.
    pub async fn score_continuous(&self, text: &str) -> ScoreOutcome<f64> {
        let cleaned = normalize(text);
        if cleaned.is_empty() {
            return ScoreOutcome { value: 0.0, provenance: Provenance::NeutralInput };
        }

        match self.client.classify(&cleaned).await {
            Ok(c) if c.confidence >= CONFIDENCE_THRESHOLD => {
                let value = match c.label {
                    Label::Flag => -c.confidence,
                    Label::Normal => c.confidence,
                };
                ScoreOutcome {
                    value: value.clamp(-1.0, 1.0),
                    provenance: Provenance::Scored,
                }
            }
            Ok(_) => ScoreOutcome { value: 0.0, provenance: Provenance::Scored },
            Err(e) => {
                warn!(error = %e, "Toxicity classification failed, defaulting to neutral");
                tokio::time::sleep(self.cooldown).await;
                ScoreOutcome { value: 0.0, provenance: Provenance::Defaulted }
            }
        }
    }

    /// Discrete contract: the same thresholding collapsed to {-1, 0, 1}.
    pub async fn score_discrete(&self, text: &str) -> ScoreOutcome<i32> {
        let outcome = self.score_continuous(text).await;
        let value = if outcome.value <= -CONFIDENCE_THRESHOLD {
            -1
        } else if outcome.value >= CONFIDENCE_THRESHOLD {
            1
        } else {
            0
        };
        ScoreOutcome { value, provenance: outcome.provenance }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::routing::post;
    use axum::Router;

    async fn scorer_for(body: &'static str) -> ToxicityScorer {
        let router = Router::new().route("/moderate", post(move || async move { body }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let client =
            HatecheckClient::new(&format!("http://{addr}/moderate"), "tok").with_rate_limit(60_000);
        ToxicityScorer::new(client).with_cooldown(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn flagged_above_threshold_scales_negative() {
        let scorer = scorer_for(r#"{"class": "flag", "confidence": 0.97}"#).await;
        let outcome = scorer.score_continuous("awful text").await;
        assert!((outcome.value + 0.97).abs() < 1e-9);
        assert_eq!(outcome.provenance, Provenance::Scored);

        let discrete = scorer.score_discrete("awful text").await;
        assert_eq!(discrete.value, -1);
    }

    #[tokio::test]
    async fn normal_above_threshold_scales_positive() {
        let scorer = scorer_for(r#"{"class": "normal", "confidence": 0.9}"#).await;
        let outcome = scorer.score_continuous("pleasant text").await;
        assert!((outcome.value - 0.9).abs() < 1e-9);

        let discrete = scorer.score_discrete("pleasant text").await;
        assert_eq!(discrete.value, 1);
    }

    #[tokio::test]
    async fn low_confidence_is_neutral_but_scored() {
        let scorer = scorer_for(r#"{"class": "flag", "confidence": 0.5}"#).await;
        let outcome = scorer.score_continuous("ambiguous text").await;
        assert_eq!(outcome.value, 0.0);
        assert_eq!(outcome.provenance, Provenance::Scored);
    }

    #[tokio::test]
    async fn classifier_failure_defaults_to_neutral() {
        let scorer = scorer_for(r#"{"class": "???"}"#).await;
        let outcome = scorer.score_continuous("some text").await;
        assert_eq!(outcome.value, 0.0);
        assert_eq!(outcome.provenance, Provenance::Defaulted);
    }

    #[tokio::test]
    async fn empty_input_never_calls_the_api() {
        // Endpoint that would panic the test if hit.
        let scorer = scorer_for(r#"{"class": "flag", "confidence": 1.0}"#).await;
        let outcome = scorer.score_continuous("<br>").await;
        assert_eq!(outcome.value, 0.0);
        assert_eq!(outcome.provenance, Provenance::NeutralInput);
    }
}
