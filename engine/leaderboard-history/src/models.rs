use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Number of weeks in a competition season
pub const WEEKS_PER_SEASON: u32 = 18;

/// Where a pull starts when there is no usable history
pub const DEFAULT_START: SeasonWeek = SeasonWeek { season: 2018, week: 1 };

/// A (season, week) position in the competition calendar.
///
/// Ordering is chronological: season first, then week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeasonWeek {
    pub season: i32,
    pub week: u32,
}

impl SeasonWeek {
    pub fn new(season: i32, week: u32) -> Self {
        Self { season, week }
    }

    /// The following week, wrapping to week 1 of the next season after the last week
    pub fn next(self) -> Self {
        if self.week >= WEEKS_PER_SEASON {
            Self { season: self.season + 1, week: 1 }
        } else {
            Self { season: self.season, week: self.week + 1 }
        }
    }
}

impl fmt::Display for SeasonWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "season {} week {}", self.season, self.week)
    }
}

/// One entrant's result for one week, as retrieved from the weekly leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRecord {
    /// Wall-clock time the week was retrieved
    #[serde(with = "timestamp")]
    pub update_time: DateTime<Utc>,
    pub season: i32,
    pub week: u32,
    /// Season-scoped entrant code
    pub code: String,
    pub name: String,
    pub points: f64,
    pub rank: u32,
    pub percentile: f64,
}

impl WeeklyRecord {
    pub fn season_week(&self) -> SeasonWeek {
        SeasonWeek::new(self.season, self.week)
    }
}

/// One entrant's standing on a full seasonal leaderboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonalRecord {
    pub season: i32,
    pub code: String,
    pub name: String,
    pub points: f64,
    pub rank: u32,
    pub percentile: f64,
    /// Fields the source provides beyond the known ones, kept verbatim
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// An entrant's week within a season, with weekly and seasonal metrics joined on.
///
/// Weeks the entrant skipped carry `weekly_points = 0.0` and no weekly rank or percentile.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedEntrantWeek {
    pub season: i32,
    pub week: u32,
    pub code: String,
    pub name: String,
    pub unique_id: Option<String>,
    pub weekly_points: f64,
    pub weekly_rank: Option<u32>,
    pub weekly_percentile: Option<f64>,
    pub seasonal_cumulative_points: f64,
    pub seasonal_points: Option<f64>,
    pub seasonal_rank: Option<u32>,
    pub seasonal_percentile: Option<f64>,
}

impl JoinedEntrantWeek {
    pub fn season_week(&self) -> SeasonWeek {
        SeasonWeek::new(self.season, self.week)
    }

    /// True when every optional column is populated
    pub fn is_complete(&self) -> bool {
        self.unique_id.is_some()
            && self.weekly_rank.is_some()
            && self.weekly_percentile.is_some()
            && self.seasonal_points.is_some()
            && self.seasonal_rank.is_some()
            && self.seasonal_percentile.is_some()
    }
}

/// A joined row for an entrant with a stable identity, with the running total across seasons
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntrantWeek {
    /// Always complete, so `entry.unique_id` is set
    pub entry: JoinedEntrantWeek,
    pub all_time_cumulative_points: f64,
}

impl TrackedEntrantWeek {
    /// Stable identity of the entrant
    pub fn unique_id(&self) -> &str {
        self.entry.unique_id.as_deref().unwrap_or_default()
    }
}

/// Serde helpers for `update_time`.
///
/// Written as RFC 3339. Read from RFC 3339 or from floating-point Unix seconds,
/// which is how older snapshots stored it.
pub mod timestamp {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(TimestampVisitor)
    }

    /// Convert Unix seconds with a fractional part into a UTC timestamp
    pub fn from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
        Utc.timestamp_opt(whole as i64, nanos).single()
    }

    struct TimestampVisitor;

    impl<'de> Visitor<'de> for TimestampVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an RFC 3339 timestamp or Unix seconds")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            from_unix_seconds(v).ok_or_else(|| E::custom(format!("timestamp out of range: {v}")))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            self.visit_f64(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            self.visit_f64(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(v) {
                return Ok(parsed.with_timezone(&Utc));
            }
            match v.trim().parse::<f64>() {
                Ok(secs) => self.visit_f64(secs),
                Err(_) => Err(E::custom(format!("unrecognised timestamp: {v:?}"))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_week_wraps_after_final_week() {
        assert_eq!(SeasonWeek::new(2019, 3).next(), SeasonWeek::new(2019, 4));
        assert_eq!(SeasonWeek::new(2019, 18).next(), SeasonWeek::new(2020, 1));
    }

    #[test]
    fn test_season_week_orders_chronologically() {
        assert!(SeasonWeek::new(2018, 18) < SeasonWeek::new(2019, 1));
        assert!(SeasonWeek::new(2019, 2) < SeasonWeek::new(2019, 10));
    }

    #[test]
    fn test_legacy_unix_seconds_timestamp() {
        let ts = timestamp::from_unix_seconds(1_538_352_000.5).unwrap();
        assert_eq!(ts.timestamp(), 1_538_352_000);
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_record_json_accepts_both_timestamp_forms() {
        let rfc = r#"{"update_time":"2019-09-10T12:00:00+00:00","season":2019,"week":1,
            "code":"ec7316ae","name":"538","points":10.0,"rank":1,"percentile":0.99}"#;
        let unix = r#"{"update_time":1568116800.0,"season":2019,"week":1,
            "code":"ec7316ae","name":"538","points":10.0,"rank":1,"percentile":0.99}"#;

        let a: WeeklyRecord = serde_json::from_str(rfc).unwrap();
        let b: WeeklyRecord = serde_json::from_str(unix).unwrap();
        assert_eq!(a.update_time, b.update_time);
    }
}
