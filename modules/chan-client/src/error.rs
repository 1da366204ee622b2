use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChanError>;

#[derive(Debug, Error)]
pub enum ChanError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ChanError {
    fn from(err: reqwest::Error) -> Self {
        ChanError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for ChanError {
    fn from(err: serde_json::Error) -> Self {
        ChanError::Parse(err.to_string())
    }
}
