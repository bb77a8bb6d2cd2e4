//! Error Types for the Career Bot

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CareerError>;

#[derive(Error, Debug)]
pub enum CareerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Notification failed: {0}")]
    Notify(String),
}
