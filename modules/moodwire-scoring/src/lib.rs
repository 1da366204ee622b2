pub mod aggregate;
pub mod media;
pub mod normalize;
pub mod sentiment;
pub mod toxicity;

pub use aggregate::aggregate;
pub use media::media_flags;
pub use normalize::normalize;
pub use sentiment::SentimentScorer;
pub use toxicity::{Provenance, ScoreOutcome, ToxicityScorer};
