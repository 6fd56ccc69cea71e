//! End-to-end run: load history, pull new weeks, merge, refresh seasons, derive tables.

use crate::config::FetcherConfig;
use crate::error::PipelineError;
use crate::fetcher::{LeaderboardFetcher, PullStop};
use leaderboard_history::{
    aggregate_tracked, join_entrants, load_history_or, merge_with_history, season_range, store,
    EntrantIdentity, SeasonWeek,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// What a completed run did
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Week the pull resumed from
    pub resumed_from: SeasonWeek,
    /// Why the weekly pull ended
    pub stop: PullStop,
    /// Rows fetched by the weekly pull
    pub fetched_rows: usize,
    /// Weeks fetched by the weekly pull
    pub fetched_weeks: usize,
    /// Rows in the merged weekly history
    pub history_rows: usize,
    /// Seasonal leaderboards refreshed
    pub seasons: Vec<i32>,
    pub seasonal_rows: usize,
    pub joined_rows: usize,
    pub tracked_rows: usize,
    /// Snapshot files written, in write order
    pub files: Vec<PathBuf>,
}

/// A single leaderboard refresh
pub struct Pipeline {
    config: FetcherConfig,
    fetcher: LeaderboardFetcher,
    identity: EntrantIdentity,
}

impl Pipeline {
    pub fn new(config: FetcherConfig, fetcher: LeaderboardFetcher, identity: EntrantIdentity) -> Self {
        Self { config, fetcher, identity }
    }

    /// Run the full refresh and write every snapshot.
    ///
    /// Weekly history is written before the seasonal leaderboards are pulled,
    /// so a seasonal failure still leaves the new weeks persisted.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        let output = &self.config.output;
        let weekly_path = output.weekly_path();

        let mut history = load_history_or(&weekly_path, self.config.history.start());
        if let Some(resume) = self.config.history.resume_override() {
            info!("Resume point overridden: pulling from {} instead of {}", resume, history.resume);
            history.resume = resume;
        }
        let resumed_from = history.resume;

        let pull = self.fetcher.fetch_weekly_from(resumed_from).await;
        if !pull.stop.is_clean() {
            warn!("Weekly pull ended early ({}); keeping the weeks fetched before it", pull.stop);
        }
        let fetched_rows = pull.records.len();
        let fetched_weeks = pull.weeks.len();
        let stop = pull.stop;

        let weekly = merge_with_history(history, pull.records);
        if weekly.is_empty() {
            return Err(PipelineError::NoWeeklyData);
        }

        let mut files = Vec::new();
        store::write_weekly(&weekly_path, &weekly)?;
        files.push(weekly_path);

        let seasons = season_range(&weekly)?;
        let seasonal = self.fetcher.fetch_seasonal(seasons.clone()).await?;
        let seasonal_path = output.seasonal_path();
        store::write_seasonal(&seasonal_path, &seasonal)?;
        files.push(seasonal_path);

        let joined = join_entrants(&weekly, &seasonal, &self.identity);
        let entrants_path = output.entrants_path();
        store::write_joined(&entrants_path, &joined)?;
        files.push(entrants_path);

        let tracked = aggregate_tracked(&joined);
        let tracked_path = output.tracked_path();
        store::write_tracked(&tracked_path, &tracked)?;
        files.push(tracked_path);

        Ok(RunSummary {
            resumed_from,
            stop,
            fetched_rows,
            fetched_weeks,
            history_rows: weekly.len(),
            seasons: seasons.collect(),
            seasonal_rows: seasonal.len(),
            joined_rows: joined.len(),
            tracked_rows: tracked.len(),
            files,
        })
    }
}
