//! CSV snapshot files.
//!
//! Every table is written with a header row and a leading unnamed row-index
//! column. Writes go to a sibling temporary file that is renamed into place.

use crate::error::{HistoryError, Result};
use crate::models::{
    JoinedEntrantWeek, SeasonalRecord, TrackedEntrantWeek, WeeklyRecord, WEEKS_PER_SEASON,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const WEEKLY_HEADERS: [&str; 8] =
    ["update_time", "season", "week", "code", "name", "points", "rank", "percentile"];

pub const SEASONAL_HEADERS: [&str; 6] = ["season", "code", "name", "points", "rank", "percentile"];

pub const JOINED_HEADERS: [&str; 12] = [
    "season",
    "week",
    "code",
    "name",
    "unique_id",
    "weekly_points",
    "weekly_rank",
    "weekly_percentile",
    "seasonal_cumulative_points",
    "seasonal_points",
    "seasonal_rank",
    "seasonal_percentile",
];

pub const ALL_TIME_HEADER: &str = "all_time_cumulative_points";

/// Read a weekly history snapshot; the row-index column is ignored
pub fn read_weekly(path: impl AsRef<Path>) -> Result<Vec<WeeklyRecord>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path.as_ref())?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: WeeklyRecord = row?;
        if record.week == 0 || record.week > WEEKS_PER_SEASON {
            return Err(HistoryError::invalid_data(format!(
                "week {} out of range for entrant {} in season {}",
                record.week, record.code, record.season
            )));
        }
        records.push(record);
    }
    Ok(records)
}

pub fn write_weekly(path: impl AsRef<Path>, records: &[WeeklyRecord]) -> Result<()> {
    let rows = records.iter().map(|r| {
        vec![
            r.update_time.to_rfc3339(),
            r.season.to_string(),
            r.week.to_string(),
            r.code.clone(),
            r.name.clone(),
            r.points.to_string(),
            r.rank.to_string(),
            r.percentile.to_string(),
        ]
    });
    write_table(path.as_ref(), WEEKLY_HEADERS.iter().map(|h| h.to_string()).collect(), rows)
}

/// Write seasonal leaderboards. Extra source columns follow the known ones,
/// as the sorted union over all records.
pub fn write_seasonal(path: impl AsRef<Path>, records: &[SeasonalRecord]) -> Result<()> {
    let extra_columns: BTreeSet<&str> =
        records.iter().flat_map(|r| r.extra.keys().map(String::as_str)).collect();

    let mut headers: Vec<String> = SEASONAL_HEADERS.iter().map(|h| h.to_string()).collect();
    headers.extend(extra_columns.iter().map(|c| c.to_string()));

    let rows = records.iter().map(|r| {
        let mut row = vec![
            r.season.to_string(),
            r.code.clone(),
            r.name.clone(),
            r.points.to_string(),
            r.rank.to_string(),
            r.percentile.to_string(),
        ];
        row.extend(extra_columns.iter().map(|c| json_field(r.extra.get(*c))));
        row
    });
    write_table(path.as_ref(), headers, rows)
}

pub fn write_joined(path: impl AsRef<Path>, rows: &[JoinedEntrantWeek]) -> Result<()> {
    let headers = JOINED_HEADERS.iter().map(|h| h.to_string()).collect();
    write_table(path.as_ref(), headers, rows.iter().map(joined_fields))
}

pub fn write_tracked(path: impl AsRef<Path>, rows: &[TrackedEntrantWeek]) -> Result<()> {
    let mut headers: Vec<String> = JOINED_HEADERS.iter().map(|h| h.to_string()).collect();
    headers.push(ALL_TIME_HEADER.to_string());

    let rows = rows.iter().map(|r| {
        let mut fields = joined_fields(&r.entry);
        fields.push(r.all_time_cumulative_points.to_string());
        fields
    });
    write_table(path.as_ref(), headers, rows)
}

fn joined_fields(r: &JoinedEntrantWeek) -> Vec<String> {
    vec![
        r.season.to_string(),
        r.week.to_string(),
        r.code.clone(),
        r.name.clone(),
        r.unique_id.clone().unwrap_or_default(),
        r.weekly_points.to_string(),
        opt(r.weekly_rank),
        opt(r.weekly_percentile),
        r.seasonal_cumulative_points.to_string(),
        opt(r.seasonal_points),
        opt(r.seasonal_rank),
        opt(r.seasonal_percentile),
    ]
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn json_field(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn write_table<I>(path: &Path, headers: Vec<String>, rows: I) -> Result<()>
where
    I: Iterator<Item = Vec<String>>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path(path);
    let mut writer = csv::Writer::from_path(&tmp_path)?;

    let mut header_row = Vec::with_capacity(headers.len() + 1);
    header_row.push(String::new());
    header_row.extend(headers);
    writer.write_record(&header_row)?;

    let mut count = 0usize;
    for (index, row) in rows.enumerate() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(index.to_string());
        record.extend(row);
        writer.write_record(&record)?;
        count += 1;
    }
    writer.flush()?;
    drop(writer);

    std::fs::rename(&tmp_path, path)?;
    debug!(path = %path.display(), rows = count, "Wrote snapshot");
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
