//! Leaderboard Fetcher
//!
//! Pulls weekly and seasonal standings of the NFL forecasting competition,
//! merges new weeks into the stored history and writes the derived
//! entrant-week reports.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod retry;
pub mod source;
pub mod throttle;

pub use config::FetcherConfig;
pub use error::{FetchError, PipelineError};
pub use fetcher::{LeaderboardFetcher, PullStop, WeeklyPull};
pub use models::*;
pub use pipeline::{Pipeline, RunSummary};
pub use source::{HttpLeaderboardSource, LeaderboardSource};
pub use throttle::Throttle;
