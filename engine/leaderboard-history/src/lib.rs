//! # Leaderboard History
//!
//! Weekly standings history for the NFL forecasting competition, and the
//! derived tables built from it.
//!
//! ## Pipeline stages
//!
//! - **loader**: read the prior weekly snapshot and find the resume point
//! - **merge**: supersede the resumed week with a fresh pull and drop duplicates
//! - **join**: expand to every entrant-week of a season, zero-fill skipped
//!   weeks and accumulate seasonal totals
//! - **tracked**: all-time totals for entrants with a stable identity
//! - **store**: CSV snapshot files

pub mod error;
pub mod identity;
pub mod join;
pub mod loader;
pub mod merge;
pub mod models;
pub mod store;
pub mod tracked;

pub use error::{HistoryError, Result};
pub use identity::EntrantIdentity;
pub use join::join_entrants;
pub use loader::{load_history, load_history_or, season_range, LoadedHistory};
pub use merge::{merge_weekly, merge_with_history};
pub use models::*;
pub use tracked::aggregate_tracked;
