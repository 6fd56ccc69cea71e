//! Error types for the history layer

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Errors that can occur while loading, merging or writing leaderboard history
#[derive(Error, Debug)]
pub enum HistoryError {
    /// I/O errors (file operations)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding/decoding errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Identity mapping file could not be parsed
    #[error("Identity mapping error in {path:?}: {source}")]
    Identity {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Data that violates the expected shape of a snapshot
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// An operation needed weekly history but there was none
    #[error("No weekly history available")]
    EmptyHistory,
}

impl HistoryError {
    /// Create a new invalid data error
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }
}
