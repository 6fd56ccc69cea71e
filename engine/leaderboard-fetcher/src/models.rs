use chrono::{DateTime, Utc};
use leaderboard_history::{SeasonalRecord, WeeklyRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of a weekly leaderboard payload. Fields beyond these are discarded.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WeeklyEntry {
    pub code: String,
    pub name: String,
    pub points: f64,
    pub rank: u32,
    pub percentile: f64,
}

/// One row of a seasonal leaderboard payload
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SeasonalEntry {
    pub code: String,
    pub name: String,
    pub points: f64,
    pub rank: u32,
    pub percentile: f64,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl WeeklyEntry {
    /// Convert to a history record for the week it was fetched for
    pub fn to_weekly_record(&self, season: i32, week: u32, update_time: DateTime<Utc>) -> WeeklyRecord {
        WeeklyRecord {
            update_time,
            season,
            week,
            code: self.code.clone(),
            name: self.name.clone(),
            points: self.points,
            rank: self.rank,
            percentile: self.percentile,
        }
    }
}

impl SeasonalEntry {
    pub fn into_seasonal_record(self, season: i32) -> SeasonalRecord {
        SeasonalRecord {
            season,
            code: self.code,
            name: self.name,
            points: self.points,
            rank: self.rank,
            percentile: self.percentile,
            extra: self.extra,
        }
    }
}
