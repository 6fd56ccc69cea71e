use anyhow::{Context, Result};
use clap::Parser;
use leaderboard_fetcher::logging::initialize_logging;
use leaderboard_fetcher::{FetcherConfig, HttpLeaderboardSource, LeaderboardFetcher, Pipeline};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Pull the forecasting competition leaderboards and refresh the CSV reports
#[derive(Parser, Debug)]
#[command(name = "pull-leaderboard", version)]
#[command(about = "Incrementally pull weekly and seasonal leaderboards into CSV history")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the snapshots are read from and written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Resume from this season instead of the latest week on disk
    #[arg(long)]
    season: Option<i32>,

    /// Week to resume from (requires --season)
    #[arg(long, requires = "season")]
    week: Option<u32>,

    /// TOML file mapping entrant codes to stable identities
    #[arg(long)]
    identity_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (pretty, json, compact)
    #[arg(long, default_value = "compact")]
    log_format: String,
}

impl Cli {
    fn apply(&self, config: &mut FetcherConfig) {
        if let Some(dir) = &self.output_dir {
            config.output.data_dir = dir.clone();
        }
        if let Some(season) = self.season {
            config.history.resume_season = Some(season);
            config.history.resume_week = self.week;
        }
        if let Some(path) = &self.identity_file {
            config.identity_file = Some(path.clone());
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    initialize_logging(&cli.log_level, &cli.log_format)?;

    info!("Starting leaderboard pull v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = FetcherConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;
    info!("Writing snapshots to {}", config.output.data_dir.display());

    let identity = config.identity()?;
    info!("Loaded {} entrant identities", identity.len());

    let source = HttpLeaderboardSource::new(config.api.clone())?;
    let fetcher = LeaderboardFetcher::new(Box::new(source), &config);
    let pipeline = Pipeline::new(config, fetcher, identity);

    match pipeline.run().await {
        Ok(summary) => {
            if summary.stop.is_clean() {
                info!("Weekly pull stopped: {}", summary.stop);
            } else {
                warn!("Weekly pull stopped early: {}", summary.stop);
            }
            info!(
                fetched_weeks = summary.fetched_weeks,
                history_rows = summary.history_rows,
                joined_rows = summary.joined_rows,
                tracked_rows = summary.tracked_rows,
                "Leaderboard pull complete"
            );
            for file in &summary.files {
                info!("Wrote {}", file.display());
            }
            Ok(())
        }
        Err(e) => {
            error!("Leaderboard pull failed: {}", e);
            Err(e).context("Leaderboard pull failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaderboard_history::SeasonWeek;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "pull-leaderboard",
            "--output-dir",
            "/srv/lb",
            "--season",
            "2022",
            "--week",
            "7",
            "--identity-file",
            "ids.toml",
        ]);
        let mut config = FetcherConfig::default();
        cli.apply(&mut config);

        assert_eq!(config.output.data_dir, PathBuf::from("/srv/lb"));
        assert_eq!(config.history.resume_override(), Some(SeasonWeek::new(2022, 7)));
        assert_eq!(config.identity_file, Some(PathBuf::from("ids.toml")));
        config.validate().unwrap();
    }

    #[test]
    fn test_week_requires_season() {
        assert!(Cli::try_parse_from(["pull-leaderboard", "--week", "3"]).is_err());
    }
}
