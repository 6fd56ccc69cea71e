//! Bootstrap from a previously written weekly history snapshot.

use crate::error::{HistoryError, Result};
use crate::models::{SeasonWeek, WeeklyRecord, DEFAULT_START};
use crate::store;
use std::ops::RangeInclusive;
use std::path::Path;
use tracing::{info, warn};

/// Prior weekly history and the point the next pull resumes from
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedHistory {
    pub prior: Option<Vec<WeeklyRecord>>,
    pub resume: SeasonWeek,
}

impl LoadedHistory {
    /// History with no prior snapshot, resuming at `start`
    pub fn fresh(start: SeasonWeek) -> Self {
        Self { prior: None, resume: start }
    }

    /// Resume from the latest week present in `records`, or from `start` when empty
    pub fn from_records(records: Vec<WeeklyRecord>, start: SeasonWeek) -> Self {
        match latest_season_week(&records) {
            Some(resume) => Self { prior: Some(records), resume },
            None => Self::fresh(start),
        }
    }
}

/// The maximum season present, paired with the maximum week within that season
pub fn latest_season_week(records: &[WeeklyRecord]) -> Option<SeasonWeek> {
    records.iter().map(WeeklyRecord::season_week).max()
}

/// Every season from the earliest to the latest present in `records`
pub fn season_range(records: &[WeeklyRecord]) -> Result<RangeInclusive<i32>> {
    let first = records.iter().map(|r| r.season).min().ok_or(HistoryError::EmptyHistory)?;
    let last = records.iter().map(|r| r.season).max().ok_or(HistoryError::EmptyHistory)?;
    Ok(first..=last)
}

/// Load the weekly snapshot at `path` with the default start of history
pub fn load_history(path: impl AsRef<Path>) -> LoadedHistory {
    load_history_or(path, DEFAULT_START)
}

/// Load the weekly snapshot at `path`.
///
/// A missing, unreadable or malformed snapshot is treated as no history and
/// the pull starts at `start`.
pub fn load_history_or(path: impl AsRef<Path>, start: SeasonWeek) -> LoadedHistory {
    let path = path.as_ref();
    if !path.exists() {
        info!("Did not find existing weekly data at {}, pulling from {}", path.display(), start);
        return LoadedHistory::fresh(start);
    }

    match store::read_weekly(path) {
        Ok(records) => {
            let loaded = LoadedHistory::from_records(records, start);
            match &loaded.prior {
                Some(prior) => info!(
                    rows = prior.len(),
                    "Found existing weekly data, pulling from most recent week ({})", loaded.resume
                ),
                None => info!("Existing weekly data is empty, pulling from {}", start),
            }
            loaded
        }
        Err(e) => {
            warn!("Could not read weekly data at {} ({}), pulling from {}", path.display(), e, start);
            LoadedHistory::fresh(start)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(season: i32, week: u32) -> WeeklyRecord {
        WeeklyRecord {
            update_time: Utc::now(),
            season,
            week,
            code: "ec7316ae".to_string(),
            name: "538".to_string(),
            points: 10.0,
            rank: 1,
            percentile: 0.99,
        }
    }

    #[test]
    fn test_missing_snapshot_starts_from_default() {
        let temp_dir = TempDir::new().unwrap();
        let loaded = load_history(temp_dir.path().join("weekly.csv"));
        assert_eq!(loaded, LoadedHistory { prior: None, resume: SeasonWeek::new(2018, 1) });
    }

    #[test]
    fn test_malformed_snapshot_is_treated_as_no_history() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("weekly.csv");
        std::fs::write(&path, ",season,week\n0,not-a-year,1\n").unwrap();

        let loaded = load_history(&path);
        assert!(loaded.prior.is_none());
        assert_eq!(loaded.resume, DEFAULT_START);
    }

    #[test]
    fn test_resume_uses_max_week_of_max_season() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("weekly.csv");
        let records = vec![record(2018, 17), record(2019, 2), record(2018, 18), record(2019, 4)];
        store::write_weekly(&path, &records).unwrap();

        let loaded = load_history(&path);
        assert_eq!(loaded.resume, SeasonWeek::new(2019, 4));
        assert_eq!(loaded.prior.map(|p| p.len()), Some(4));
    }

    #[test]
    fn test_season_range_covers_gaps() {
        let records = vec![record(2020, 1), record(2018, 3)];
        assert_eq!(season_range(&records).unwrap(), 2018..=2020);
        assert!(matches!(season_range(&[]), Err(HistoryError::EmptyHistory)));
    }

    #[test]
    fn test_empty_snapshot_starts_from_given_point() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("weekly.csv");
        store::write_weekly(&path, &[]).unwrap();

        let loaded = load_history_or(&path, SeasonWeek::new(2020, 1));
        assert_eq!(loaded, LoadedHistory::fresh(SeasonWeek::new(2020, 1)));
    }
}
