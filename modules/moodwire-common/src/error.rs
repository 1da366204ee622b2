use thiserror::Error;

#[derive(Error, Debug)]
pub enum MoodwireError {
    #[error("Transient upstream failure: {0}")]
    Transient(String),

    #[error("Data shape error for {identity}: {message}")]
    DataShape { identity: String, message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
