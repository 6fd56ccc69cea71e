//! Building the full entrant-week table from weekly history and seasonal leaderboards.

use crate::identity::EntrantIdentity;
use crate::models::{JoinedEntrantWeek, SeasonWeek, SeasonalRecord, WeeklyRecord};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Join weekly and seasonal metrics onto every (season, week, entrant) combination.
///
/// Every entrant seen at least once in a season gets a row for every week of
/// that season present in history. Weeks without a weekly result count as
/// zero points. Rows are ordered by season, week and seasonal points, and
/// `seasonal_cumulative_points` accumulates in that order per (code, season).
pub fn join_entrants(
    weekly: &[WeeklyRecord],
    seasonal: &[SeasonalRecord],
    identity: &EntrantIdentity,
) -> Vec<JoinedEntrantWeek> {
    let weeks = distinct_weeks(weekly);
    let entrants = entrants_by_season(weekly);
    let seasonal_index = index_seasonal(seasonal);
    let weekly_index = index_weekly(weekly);

    let mut rows = Vec::new();
    for sw in &weeks {
        let Some(season_entrants) = entrants.get(&sw.season) else {
            continue;
        };
        for &(code, name) in season_entrants {
            let standing = seasonal_index.get(&(sw.season, code, name));
            let result = weekly_index.get(&(sw.season, code, name, sw.week));

            rows.push(JoinedEntrantWeek {
                season: sw.season,
                week: sw.week,
                code: code.to_string(),
                name: name.to_string(),
                unique_id: identity.unique_id(code).map(str::to_string),
                weekly_points: result.map(|r| r.points).unwrap_or(0.0),
                weekly_rank: result.map(|r| r.rank),
                weekly_percentile: result.map(|r| r.percentile),
                seasonal_cumulative_points: 0.0,
                seasonal_points: standing.map(|s| s.points),
                seasonal_rank: standing.map(|s| s.rank),
                seasonal_percentile: standing.map(|s| s.percentile),
            });
        }
    }

    rows.sort_by(|a, b| {
        a.season
            .cmp(&b.season)
            .then(a.week.cmp(&b.week))
            .then_with(|| cmp_missing_last(a.seasonal_points, b.seasonal_points))
    });

    let mut running: HashMap<(String, i32), f64> = HashMap::new();
    for row in &mut rows {
        let total = running.entry((row.code.clone(), row.season)).or_insert(0.0);
        *total += row.weekly_points;
        row.seasonal_cumulative_points = *total;
    }

    info!(
        rows = rows.len(),
        weeks = weeks.len(),
        tracked = rows.iter().filter(|r| r.unique_id.is_some()).count(),
        "Joined entrant weeks"
    );
    rows
}

/// Distinct (season, week) pairs in first-seen order
fn distinct_weeks(weekly: &[WeeklyRecord]) -> Vec<SeasonWeek> {
    let mut seen = HashSet::new();
    weekly.iter().map(WeeklyRecord::season_week).filter(|sw| seen.insert(*sw)).collect()
}

/// Distinct (code, name) entrants per season in first-seen order
fn entrants_by_season(weekly: &[WeeklyRecord]) -> HashMap<i32, Vec<(&str, &str)>> {
    let mut seen = HashSet::new();
    let mut by_season: HashMap<i32, Vec<(&str, &str)>> = HashMap::new();
    for r in weekly {
        if seen.insert((r.season, r.code.as_str(), r.name.as_str())) {
            by_season.entry(r.season).or_default().push((r.code.as_str(), r.name.as_str()));
        }
    }
    by_season
}

fn index_seasonal(seasonal: &[SeasonalRecord]) -> HashMap<(i32, &str, &str), &SeasonalRecord> {
    let mut index = HashMap::with_capacity(seasonal.len());
    for s in seasonal {
        index.entry((s.season, s.code.as_str(), s.name.as_str())).or_insert(s);
    }
    index
}

/// One weekly result per entrant-week; re-fetched copies resolve to the latest
fn index_weekly(weekly: &[WeeklyRecord]) -> HashMap<(i32, &str, &str, u32), &WeeklyRecord> {
    let mut index: HashMap<(i32, &str, &str, u32), &WeeklyRecord> =
        HashMap::with_capacity(weekly.len());
    for r in weekly {
        let key = (r.season, r.code.as_str(), r.name.as_str(), r.week);
        match index.get(&key) {
            Some(existing) if existing.update_time >= r.update_time => {
                debug!(code = %r.code, "Ignoring older copy of {}", r.season_week());
            }
            _ => {
                index.insert(key, r);
            }
        }
    }
    index
}

fn cmp_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn weekly(season: i32, week: u32, code: &str, points: f64) -> WeeklyRecord {
        WeeklyRecord {
            update_time: Utc.with_ymd_and_hms(2019, 12, 1, 0, 0, 0).unwrap(),
            season,
            week,
            code: code.to_string(),
            name: format!("name-{code}"),
            points,
            rank: 5,
            percentile: 0.8,
        }
    }

    fn seasonal(season: i32, code: &str, points: f64) -> SeasonalRecord {
        SeasonalRecord {
            season,
            code: code.to_string(),
            name: format!("name-{code}"),
            points,
            rank: 2,
            percentile: 0.9,
            extra: Default::default(),
        }
    }

    fn find<'a>(rows: &'a [JoinedEntrantWeek], code: &str, week: u32) -> &'a JoinedEntrantWeek {
        rows.iter().find(|r| r.code == code && r.week == week).unwrap()
    }

    #[test]
    fn test_skipped_week_is_zero_filled() {
        // "b" plays every week, which makes week 2 part of the season; "a" skips it.
        let history = vec![
            weekly(2019, 1, "a", 7.0),
            weekly(2019, 1, "b", 1.0),
            weekly(2019, 2, "b", 2.0),
            weekly(2019, 3, "a", 5.0),
            weekly(2019, 3, "b", 3.0),
        ];
        let rows = join_entrants(&history, &[seasonal(2019, "a", 12.0)], &EntrantIdentity::default());

        assert_eq!(rows.len(), 6);
        let skipped = find(&rows, "a", 2);
        assert_eq!(skipped.weekly_points, 0.0);
        assert_eq!(skipped.weekly_rank, None);
        assert_eq!(skipped.seasonal_cumulative_points, find(&rows, "a", 1).seasonal_cumulative_points);
        assert_eq!(find(&rows, "a", 3).seasonal_cumulative_points, 12.0);
    }

    #[test]
    fn test_final_week_cumulative_equals_season_total() {
        let history = vec![
            weekly(2018, 1, "a", 3.0),
            weekly(2018, 2, "a", 4.5),
            weekly(2018, 2, "b", 1.0),
            weekly(2018, 3, "b", 2.0),
            weekly(2019, 1, "a", 100.0),
        ];
        let rows = join_entrants(&history, &[], &EntrantIdentity::default());

        for code in ["a", "b"] {
            let season: Vec<_> = rows.iter().filter(|r| r.code == code && r.season == 2018).collect();
            let total: f64 = season.iter().map(|r| r.weekly_points).sum();
            let last = season.iter().max_by_key(|r| r.week).unwrap();
            assert_eq!(last.seasonal_cumulative_points, total);
        }
        // Cumulative totals restart with each season.
        let next_season = rows.iter().find(|r| r.season == 2019).unwrap();
        assert_eq!(next_season.seasonal_cumulative_points, 100.0);
    }

    #[test]
    fn test_rows_sorted_by_season_week_then_seasonal_points() {
        let history = vec![
            weekly(2019, 2, "hi", 1.0),
            weekly(2019, 2, "none", 1.0),
            weekly(2019, 2, "lo", 1.0),
            weekly(2018, 1, "hi", 1.0),
        ];
        let standings = vec![seasonal(2019, "hi", 90.0), seasonal(2019, "lo", 10.0)];
        let rows = join_entrants(&history, &standings, &EntrantIdentity::default());

        let order: Vec<_> = rows.iter().map(|r| (r.season, r.week, r.code.as_str())).collect();
        assert_eq!(
            order,
            vec![(2018, 1, "hi"), (2019, 2, "lo"), (2019, 2, "hi"), (2019, 2, "none")]
        );
    }

    #[test]
    fn test_seasonal_metrics_and_identity_attached() {
        let history = vec![weekly(2019, 1, "ec7316ae", 4.0), weekly(2019, 1, "zz", 2.0)];
        let rows = join_entrants(&history, &[seasonal(2019, "ec7316ae", 50.0)], &EntrantIdentity::builtin());

        let known = find(&rows, "ec7316ae", 1);
        assert_eq!(known.unique_id.as_deref(), Some("538"));
        assert_eq!(known.seasonal_points, Some(50.0));
        assert_eq!(known.seasonal_rank, Some(2));
        assert_eq!(known.weekly_percentile, Some(0.8));

        let unknown = find(&rows, "zz", 1);
        assert_eq!(unknown.unique_id, None);
        assert_eq!(unknown.seasonal_points, None);
    }

    #[test]
    fn test_latest_copy_of_a_week_wins() {
        let mut older = weekly(2019, 1, "a", 3.0);
        older.update_time = Utc.with_ymd_and_hms(2019, 9, 1, 0, 0, 0).unwrap();
        let newer = weekly(2019, 1, "a", 4.0);

        let rows = join_entrants(&[newer, older], &[], &EntrantIdentity::default());

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].weekly_points, 4.0);
    }
}
