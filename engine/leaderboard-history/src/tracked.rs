//! All-time running totals for entrants with a stable identity.

use crate::models::{JoinedEntrantWeek, TrackedEntrantWeek};
use std::collections::HashMap;
use tracing::info;

/// Keep fully populated rows of identified entrants and accumulate their
/// weekly points across seasons in chronological order.
pub fn aggregate_tracked(joined: &[JoinedEntrantWeek]) -> Vec<TrackedEntrantWeek> {
    let mut rows: Vec<JoinedEntrantWeek> = joined
        .iter()
        .filter(|r| r.is_complete())
        .cloned()
        .collect();

    rows.sort_by(|a, b| {
        a.unique_id.cmp(&b.unique_id).then(a.season.cmp(&b.season)).then(a.week.cmp(&b.week))
    });

    let mut running: HashMap<String, f64> = HashMap::new();
    let tracked: Vec<TrackedEntrantWeek> = rows
        .into_iter()
        .map(|entry| {
            let total = running.entry(entry.unique_id.clone().unwrap_or_default()).or_insert(0.0);
            *total += entry.weekly_points;
            TrackedEntrantWeek { all_time_cumulative_points: *total, entry }
        })
        .collect();

    info!(rows = tracked.len(), entrants = running.len(), "Aggregated tracked entrants");
    tracked
}
