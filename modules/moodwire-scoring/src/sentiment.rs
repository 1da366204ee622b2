use vader_sentiment::SentimentIntensityAnalyzer;

use crate::normalize::normalize;

/// Lexicon/rule-based sentiment model. Deterministic, no network calls;
/// treated as a black box producing a compound score on [-1, 1].
pub struct SentimentScorer {
    analyzer: SentimentIntensityAnalyzer<'static>,
}

impl SentimentScorer {
    pub fn new() -> Self {
        Self {
            analyzer: SentimentIntensityAnalyzer::new(),
        }
    }

    /// Compound sentiment of the normalized text. Empty or non-text input
    /// scores neutral rather than erroring.
    pub fn score(&self, text: &str) -> f64 {
        let cleaned = normalize(text);
        if cleaned.is_empty() {
            return 0.0;
        }

        let scores = self.analyzer.polarity_scores(&cleaned);
        scores
            .get("compound")
            .copied()
            .unwrap_or(0.0)
            .clamp(-1.0, 1.0)
    }
}

impl Default for SentimentScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_neutral() {
        let scorer = SentimentScorer::new();
        assert_eq!(scorer.score(""), 0.0);
        assert_eq!(scorer.score("   "), 0.0);
        assert_eq!(scorer.score("<br><br>"), 0.0);
    }

    #[test]
    fn polarity_has_the_right_sign() {
        let scorer = SentimentScorer::new();
        assert!(scorer.score("this is wonderful, I love it!") > 0.0);
        assert!(scorer.score("this is horrible, I hate it") < 0.0);
    }

    #[test]
    fn scores_stay_in_range() {
        let scorer = SentimentScorer::new();
        let s = scorer.score("amazing fantastic wonderful great superb excellent!");
        assert!((-1.0..=1.0).contains(&s));
    }
}
