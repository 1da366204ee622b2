use thiserror::Error;

pub type Result<T> = std::result::Result<T, HatecheckError>;

#[derive(Debug, Error)]
pub enum HatecheckError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for HatecheckError {
    fn from(err: reqwest::Error) -> Self {
        HatecheckError::Network(err.to_string())
    }
}
