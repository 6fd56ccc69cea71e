use crate::config::{FetcherConfig, MissingSeasonPolicy, RetryConfig};
use crate::error::{FetchError, PipelineError};
use crate::retry::run_with_retry;
use crate::source::LeaderboardSource;
use crate::throttle::Throttle;
use chrono::{Datelike, Utc};
use leaderboard_history::{SeasonWeek, SeasonalRecord, WeeklyRecord};
use std::fmt;
use std::ops::RangeInclusive;
use tracing::{error, info, warn};

/// Why an incremental weekly pull stopped
#[derive(Debug, Clone, PartialEq)]
pub enum PullStop {
    /// The next week has not been published; the normal end of a pull
    NotPublished(SeasonWeek),

    /// The week was served but held no entrants
    Empty(SeasonWeek),

    /// The source answered with something that is not a leaderboard
    Malformed { at: SeasonWeek, reason: String },

    /// Transient failures outlasted the retry policy
    RetriesExhausted { at: SeasonWeek, reason: String },

    /// The pull walked past the season limit without hitting an unpublished week
    SeasonLimit(SeasonWeek),
}

impl PullStop {
    /// Whether the pull ran until data ran out rather than failing part way
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::NotPublished(_) | Self::Empty(_))
    }
}

impl fmt::Display for PullStop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPublished(at) => write!(f, "{at} not published"),
            Self::Empty(at) => write!(f, "{at} has no entrants"),
            Self::Malformed { at, reason } => write!(f, "malformed leaderboard for {at}: {reason}"),
            Self::RetriesExhausted { at, reason } => write!(f, "retries exhausted for {at}: {reason}"),
            Self::SeasonLimit(at) => write!(f, "season limit reached at {at}"),
        }
    }
}

/// Result of an incremental weekly pull
#[derive(Debug, Clone)]
pub struct WeeklyPull {
    /// Every fetched row, in fetch order
    pub records: Vec<WeeklyRecord>,

    /// Weeks fetched successfully, in order
    pub weeks: Vec<SeasonWeek>,

    pub stop: PullStop,
}

/// Retrieves weekly and seasonal leaderboards from a source
pub struct LeaderboardFetcher {
    source: Box<dyn LeaderboardSource>,
    throttle: Throttle,
    retry: RetryConfig,
    missing_season_policy: MissingSeasonPolicy,
    max_season: i32,
}

impl LeaderboardFetcher {
    /// Create a fetcher over `source` using the throttle, retry and seasonal settings of `config`
    pub fn new(source: Box<dyn LeaderboardSource>, config: &FetcherConfig) -> Self {
        Self {
            source,
            throttle: Throttle::from_config(&config.throttle),
            retry: config.retry.clone(),
            missing_season_policy: config.seasonal.on_missing_season,
            // Seasons are named by the year they start; nothing later than next year can exist.
            max_season: Utc::now().year() + 1,
        }
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_max_season(mut self, max_season: i32) -> Self {
        self.max_season = max_season;
        self
    }

    /// Pull weekly leaderboards from `start` onwards until one is unavailable.
    ///
    /// Weeks advance 1..=18 and then roll into the next season. Transient
    /// failures are retried; any other failure ends the pull, keeping what
    /// was already fetched. A week served with no entrants also ends it.
    pub async fn fetch_weekly_from(&self, start: SeasonWeek) -> WeeklyPull {
        let mut records = Vec::new();
        let mut weeks = Vec::new();
        let mut current = start;

        let stop = loop {
            if current.season > self.max_season {
                warn!("Stopping weekly pull at {}: beyond season {}", current, self.max_season);
                break PullStop::SeasonLimit(current);
            }
            if !weeks.is_empty() {
                self.throttle.pause().await;
            }

            info!("Pulling week {}, {} results...", current.week, current.season);
            let result = run_with_retry(
                || self.source.fetch_weekly(current.season, current.week),
                &self.retry,
            )
            .await;

            match result {
                Ok(entries) if entries.is_empty() => {
                    info!("Leaderboard for {} is empty, stopping", current);
                    break PullStop::Empty(current);
                }
                Ok(entries) => {
                    let update_time = Utc::now();
                    info!(rows = entries.len(), "Fetched {}", current);
                    records.extend(
                        entries
                            .iter()
                            .map(|e| e.to_weekly_record(current.season, current.week, update_time)),
                    );
                    weeks.push(current);
                    current = current.next();
                }
                Err(FetchError::NotPublished(reason)) => {
                    info!("No leaderboard for {} yet ({}), stopping", current, reason);
                    break PullStop::NotPublished(current);
                }
                Err(FetchError::Malformed(reason)) => {
                    error!("Malformed leaderboard for {}: {}", current, reason);
                    break PullStop::Malformed { at: current, reason };
                }
                Err(FetchError::Transient(reason)) => {
                    error!("Giving up on {} after retries: {}", current, reason);
                    break PullStop::RetriesExhausted { at: current, reason };
                }
            }
        };

        info!(rows = records.len(), weeks = weeks.len(), "Weekly pull finished");
        WeeklyPull { records, weeks, stop }
    }

    /// Fetch the current seasonal leaderboard of every season in `seasons`
    pub async fn fetch_seasonal(
        &self,
        seasons: RangeInclusive<i32>,
    ) -> Result<Vec<SeasonalRecord>, PipelineError> {
        info!("Pulling season leaderboards for {}..={}", seasons.start(), seasons.end());

        let mut records = Vec::new();
        for season in seasons {
            match run_with_retry(|| self.source.fetch_seasonal(season), &self.retry).await {
                Ok(entries) => {
                    info!(rows = entries.len(), "Fetched season {} leaderboard", season);
                    records.extend(entries.into_iter().map(|e| e.into_seasonal_record(season)));
                }
                Err(e) if self.missing_season_policy == MissingSeasonPolicy::Skip => {
                    warn!("Skipping season {} leaderboard: {}", season, e);
                }
                Err(source) => {
                    error!("Failed to fetch season {} leaderboard: {}", season, source);
                    return Err(PipelineError::SeasonalFetch { season, source });
                }
            }
        }
        Ok(records)
    }
}
