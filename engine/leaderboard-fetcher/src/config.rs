use anyhow::{Context, Result};
use leaderboard_history::{EntrantIdentity, SeasonWeek, DEFAULT_START, WEEKS_PER_SEASON};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `LEADERBOARD__OUTPUT__DATA_DIR`
pub const ENV_PREFIX: &str = "LEADERBOARD";

/// Configuration for a leaderboard pull
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Remote leaderboard API
    pub api: ApiConfig,

    /// Where snapshots are written
    pub output: OutputConfig,

    /// Start of history and resume override
    pub history: HistoryConfig,

    /// Pause between weekly requests
    pub throttle: ThrottleConfig,

    /// Retry policy for transient failures
    pub retry: RetryConfig,

    /// Seasonal leaderboard refresh
    pub seasonal: SeasonalConfig,

    /// TOML file with an `[entrants]` code -> unique id table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, without trailing slash
    pub base_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding every snapshot
    pub data_dir: PathBuf,

    pub weekly_file: String,
    pub seasonal_file: String,
    pub entrants_file: String,
    pub tracked_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// First season pulled when there is no history
    pub start_season: i32,

    /// First week pulled when there is no history
    pub start_week: u32,

    /// Resume from this season instead of the latest week in history
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_season: Option<i32>,

    /// Week to resume from within `resume_season` (defaults to 1)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_week: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    /// Minimum pause between requests in milliseconds
    pub min_delay_ms: u64,

    /// Upper bound of the random extra pause in milliseconds
    pub jitter_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: u32,

    /// Initial retry delay in seconds
    pub initial_delay_secs: u64,

    /// Maximum retry delay in seconds
    pub max_delay_secs: u64,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalConfig {
    pub on_missing_season: MissingSeasonPolicy,
}

/// What to do when a seasonal leaderboard cannot be fetched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingSeasonPolicy {
    /// Fail the run
    #[default]
    Abort,
    /// Log a warning and continue without that season
    Skip,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://projects.fivethirtyeight.com/nfl-api".to_string(),
            request_timeout_secs: 30,
            user_agent: concat!("leaderboard-fetcher/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            weekly_file: "weekly_538_competition_data.csv".to_string(),
            seasonal_file: "538_competition_leaderboard.csv".to_string(),
            entrants_file: "all_entrants.csv".to_string(),
            tracked_file: "tracked_entrants.csv".to_string(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            start_season: DEFAULT_START.season,
            start_week: DEFAULT_START.week,
            resume_season: None,
            resume_week: None,
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self { min_delay_ms: 750, jitter_ms: 2000 }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 3, initial_delay_secs: 2, max_delay_secs: 60, backoff_multiplier: 2.0 }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn weekly_url(&self, season: i32, week: u32) -> String {
        format!("{}/{}/leaderboard_week_{}.json", self.base_url.trim_end_matches('/'), season, week)
    }

    pub fn seasonal_url(&self, season: i32) -> String {
        format!("{}/{}/leaderboard.json", self.base_url.trim_end_matches('/'), season)
    }
}

impl OutputConfig {
    pub fn weekly_path(&self) -> PathBuf {
        self.data_dir.join(&self.weekly_file)
    }

    pub fn seasonal_path(&self) -> PathBuf {
        self.data_dir.join(&self.seasonal_file)
    }

    pub fn entrants_path(&self) -> PathBuf {
        self.data_dir.join(&self.entrants_file)
    }

    pub fn tracked_path(&self) -> PathBuf {
        self.data_dir.join(&self.tracked_file)
    }
}

impl HistoryConfig {
    /// Where a pull starts without history
    pub fn start(&self) -> SeasonWeek {
        SeasonWeek::new(self.start_season, self.start_week)
    }

    /// Explicit resume point, if one was configured
    pub fn resume_override(&self) -> Option<SeasonWeek> {
        self.resume_season.map(|season| SeasonWeek::new(season, self.resume_week.unwrap_or(1)))
    }
}

impl RetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

impl FetcherConfig {
    /// Load configuration: defaults, then the optional TOML file, then
    /// `LEADERBOARD__*` environment variables
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let defaults = ::config::Config::try_from(&Self::default())
            .context("Failed to build default configuration")?;

        let mut builder = ::config::Config::builder().add_source(defaults);
        if let Some(path) = config_file {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true),
        );

        let config: Self = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            anyhow::bail!("api.base_url must not be empty");
        }
        if self.api.request_timeout_secs == 0 {
            anyhow::bail!("api.request_timeout_secs must be greater than zero");
        }
        if self.retry.backoff_multiplier < 1.0 {
            anyhow::bail!(
                "retry.backoff_multiplier must be at least 1.0, got {}",
                self.retry.backoff_multiplier
            );
        }
        validate_week("history.start_week", self.history.start_week)?;
        if let Some(week) = self.history.resume_week {
            if self.history.resume_season.is_none() {
                anyhow::bail!("history.resume_week requires history.resume_season");
            }
            validate_week("history.resume_week", week)?;
        }
        Ok(())
    }

    /// The configured identity mapping, or the built-in one
    pub fn identity(&self) -> Result<EntrantIdentity> {
        match &self.identity_file {
            Some(path) => EntrantIdentity::from_toml_file(path)
                .with_context(|| format!("Failed to load identity mapping from {}", path.display())),
            None => Ok(EntrantIdentity::builtin()),
        }
    }
}

fn validate_week(field: &str, week: u32) -> Result<()> {
    if week == 0 || week > WEEKS_PER_SEASON {
        anyhow::bail!("{field} must be between 1 and {WEEKS_PER_SEASON}, got {week}");
    }
    Ok(())
}
