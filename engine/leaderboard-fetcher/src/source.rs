//! Remote leaderboard source.

use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::models::{SeasonalEntry, WeeklyEntry};
use anyhow::Context;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

/// Where weekly and seasonal leaderboards come from
#[async_trait::async_trait]
pub trait LeaderboardSource: Send + Sync {
    /// Leaderboard for a single week of a season
    async fn fetch_weekly(&self, season: i32, week: u32) -> Result<Vec<WeeklyEntry>, FetchError>;

    /// Current full-season leaderboard
    async fn fetch_seasonal(&self, season: i32) -> Result<Vec<SeasonalEntry>, FetchError>;
}

/// Leaderboards served as static JSON files over HTTP
pub struct HttpLeaderboardSource {
    config: ApiConfig,
    client: Client,
}

impl HttpLeaderboardSource {
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, client })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_builder() {
                FetchError::malformed(format!("{url}: {e}"))
            } else {
                FetchError::transient(format!("{url}: {e}"))
            }
        })?;

        if let Some(err) = classify_status(response.status(), url) {
            return Err(err);
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::transient(format!("{url}: failed to read body: {e}")))?;

        decode_body(&body, url)
    }
}

/// Decode a successful response body; anything that does not parse is malformed
pub fn decode_body<T: DeserializeOwned>(body: &[u8], url: &str) -> Result<T, FetchError> {
    serde_json::from_slice(body).map_err(|e| FetchError::malformed(format!("{url}: {e}")))
}

#[async_trait::async_trait]
impl LeaderboardSource for HttpLeaderboardSource {
    async fn fetch_weekly(&self, season: i32, week: u32) -> Result<Vec<WeeklyEntry>, FetchError> {
        self.get_json(&self.config.weekly_url(season, week)).await
    }

    async fn fetch_seasonal(&self, season: i32) -> Result<Vec<SeasonalEntry>, FetchError> {
        self.get_json(&self.config.seasonal_url(season)).await
    }
}

/// Map an HTTP status to a fetch failure, or `None` on success.
///
/// Unpublished leaderboards come back as 404, or 403 from the CDN.
pub fn classify_status(status: StatusCode, url: &str) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    let detail = format!("{url}: HTTP {status}");
    Some(match status {
        StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => FetchError::NotPublished(detail),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => FetchError::Transient(detail),
        s if s.is_server_error() => FetchError::Transient(detail),
        _ => FetchError::Malformed(detail),
    })
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-memory source for tests

    use super::*;
    use leaderboard_history::SeasonWeek;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned leaderboards; anything not registered is unpublished
    #[derive(Default)]
    pub struct MemorySource {
        weekly: HashMap<SeasonWeek, Result<Vec<WeeklyEntry>, FetchError>>,
        seasonal: HashMap<i32, Result<Vec<SeasonalEntry>, FetchError>>,
        transient_failures: Mutex<HashMap<SeasonWeek, u32>>,
        requests: Mutex<Vec<String>>,
    }

    pub fn entry(code: &str, name: &str, points: f64) -> WeeklyEntry {
        WeeklyEntry { code: code.into(), name: name.into(), points, rank: 1, percentile: 0.5 }
    }

    pub fn standing(code: &str, name: &str, points: f64) -> SeasonalEntry {
        SeasonalEntry {
            code: code.into(),
            name: name.into(),
            points,
            rank: 1,
            percentile: 0.5,
            extra: Default::default(),
        }
    }

    impl MemorySource {
        pub fn with_week(mut self, season: i32, week: u32, entries: Vec<WeeklyEntry>) -> Self {
            self.weekly.insert(SeasonWeek::new(season, week), Ok(entries));
            self
        }

        pub fn with_week_error(mut self, season: i32, week: u32, error: FetchError) -> Self {
            self.weekly.insert(SeasonWeek::new(season, week), Err(error));
            self
        }

        /// Fail the week with a transient error `times` times before serving it
        pub fn flaky_week(self, season: i32, week: u32, times: u32) -> Self {
            if let Ok(mut failures) = self.transient_failures.lock() {
                failures.insert(SeasonWeek::new(season, week), times);
            }
            self
        }

        pub fn with_season(mut self, season: i32, entries: Vec<SeasonalEntry>) -> Self {
            self.seasonal.insert(season, Ok(entries));
            self
        }

        pub fn with_season_error(mut self, season: i32, error: FetchError) -> Self {
            self.seasonal.insert(season, Err(error));
            self
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().map(|r| r.clone()).unwrap_or_default()
        }

        fn record(&self, request: String) {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request);
            }
        }
    }

    #[async_trait::async_trait]
    impl LeaderboardSource for MemorySource {
        async fn fetch_weekly(&self, season: i32, week: u32) -> Result<Vec<WeeklyEntry>, FetchError> {
            let key = SeasonWeek::new(season, week);
            self.record(format!("weekly {season}/{week}"));

            if let Ok(mut failures) = self.transient_failures.lock() {
                if let Some(remaining) = failures.get_mut(&key).filter(|n| **n > 0) {
                    *remaining -= 1;
                    return Err(FetchError::transient("simulated outage"));
                }
            }

            self.weekly
                .get(&key)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::not_published(format!("{key}"))))
        }

        async fn fetch_seasonal(&self, season: i32) -> Result<Vec<SeasonalEntry>, FetchError> {
            self.record(format!("seasonal {season}"));
            self.seasonal
                .get(&season)
                .cloned()
                .unwrap_or_else(|| Err(FetchError::not_published(format!("season {season}"))))
        }
    }
}
