//! Error types for leaderboard retrieval

use leaderboard_history::HistoryError;
use thiserror::Error;

/// Why a single leaderboard request did not produce data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The leaderboard does not exist (yet); the expected end of available data
    #[error("Leaderboard not published: {0}")]
    NotPublished(String),

    /// Network failure, timeout or server-side error worth retrying
    #[error("Transient fetch failure: {0}")]
    Transient(String),

    /// The source answered with something that is not a leaderboard
    #[error("Malformed leaderboard response: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn not_published(msg: impl Into<String>) -> Self {
        Self::NotPublished(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Failures that abort a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A seasonal leaderboard could not be retrieved
    #[error("Failed to fetch seasonal leaderboard for {season}: {source}")]
    SeasonalFetch {
        season: i32,
        #[source]
        source: FetchError,
    },

    /// Neither prior history nor the new pull produced any weekly rows
    #[error("No weekly data available: no prior history and nothing was fetched")]
    NoWeeklyData,

    /// Reading or writing history failed
    #[error(transparent)]
    History(#[from] HistoryError),
}
