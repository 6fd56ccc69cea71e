//! Merging freshly pulled weeks into prior history.

use crate::loader::LoadedHistory;
use crate::models::{SeasonWeek, WeeklyRecord};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

/// Merge a pull into the history it resumed from.
///
/// The pull started at `history.resume`, so that is also where prior rows
/// start being superseded.
pub fn merge_with_history(history: LoadedHistory, fresh: Vec<WeeklyRecord>) -> Vec<WeeklyRecord> {
    merge_weekly(history.prior, fresh, history.resume)
}

/// Combine prior history with freshly fetched rows.
///
/// The fresh pull began at `resume`; prior rows from `resume` up to the last
/// week the pull reached are dropped in favour of it. When resuming from the
/// latest prior week this drops exactly that (possibly partial) week. An
/// empty pull supersedes nothing. Exact duplicate rows are removed, keeping
/// the first occurrence; rows that differ only in `update_time` are distinct.
pub fn merge_weekly(
    prior: Option<Vec<WeeklyRecord>>,
    fresh: Vec<WeeklyRecord>,
    resume: SeasonWeek,
) -> Vec<WeeklyRecord> {
    let combined = match prior {
        None => fresh,
        Some(prior) => match fresh.iter().map(WeeklyRecord::season_week).max() {
            None => prior,
            Some(reached) => {
                let before = prior.len();
                let mut kept: Vec<WeeklyRecord> = prior
                    .into_iter()
                    .filter(|r| {
                        let sw = r.season_week();
                        sw < resume || sw > reached
                    })
                    .collect();
                debug!(
                    superseded = before - kept.len(),
                    "Dropped prior rows from {} through {}", resume, reached
                );
                kept.extend(fresh);
                kept
            }
        },
    };

    let merged = drop_duplicates(combined);
    info!(rows = merged.len(), "Merged weekly history");
    merged
}

/// Remove exact duplicate rows, keeping the first of each
pub fn drop_duplicates(records: Vec<WeeklyRecord>) -> Vec<WeeklyRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records.into_iter().filter(|r| seen.insert(RowKey::from(r))).collect()
}

#[derive(PartialEq, Eq, Hash)]
struct RowKey {
    update_time: DateTime<Utc>,
    season: i32,
    week: u32,
    code: String,
    name: String,
    points: u64,
    rank: u32,
    percentile: u64,
}

impl From<&WeeklyRecord> for RowKey {
    fn from(r: &WeeklyRecord) -> Self {
        Self {
            update_time: r.update_time,
            season: r.season,
            week: r.week,
            code: r.code.clone(),
            name: r.name.clone(),
            points: r.points.to_bits(),
            rank: r.rank,
            percentile: r.percentile.to_bits(),
        }
    }
}
