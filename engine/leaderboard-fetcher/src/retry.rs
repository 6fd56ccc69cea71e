//! Bounded exponential backoff for transient fetch failures.

use crate::config::RetryConfig;
use crate::error::FetchError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run `f`, retrying only transient failures.
///
/// Makes at most `max_retries + 1` attempts. Non-transient errors and the
/// last transient error are returned as-is.
pub async fn run_with_retry<F, Fut, T>(mut f: F, retry_config: &RetryConfig) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut delay = retry_config.initial_delay();
    let attempts = retry_config.max_retries + 1;
    let mut attempt = 1;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!("Attempt {} of {} failed: {}, retrying in {:?}", attempt, attempts, e, delay);
                tokio::time::sleep(delay).await;

                // Exponential backoff
                delay = next_delay(delay, retry_config);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn next_delay(delay: Duration, retry_config: &RetryConfig) -> Duration {
    delay.mul_f64(retry_config.backoff_multiplier).min(retry_config.max_delay())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn policy(max_retries: u32) -> RetryConfig {
        RetryConfig { max_retries, initial_delay_secs: 0, max_delay_secs: 0, backoff_multiplier: 2.0 }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let calls = Cell::new(0);
        let result = run_with_retry(
            || {
                calls.set(calls.get() + 1);
                let n = calls.get();
                async move {
                    if n < 3 {
                        Err(FetchError::transient("connection reset"))
                    } else {
                        Ok(n)
                    }
                }
            },
            &policy(3),
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Cell::new(0);
        let result: Result<(), _> = run_with_retry(
            || {
                calls.set(calls.get() + 1);
                async { Err(FetchError::transient("503")) }
            },
            &policy(2),
        )
        .await;

        assert_eq!(result, Err(FetchError::transient("503")));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn test_not_published_is_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = run_with_retry(
            || {
                calls.set(calls.get() + 1);
                async { Err(FetchError::not_published("404")) }
            },
            &policy(5),
        )
        .await;

        assert_eq!(result, Err(FetchError::not_published("404")));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig {
            max_retries: 5,
            initial_delay_secs: 2,
            max_delay_secs: 5,
            backoff_multiplier: 2.0,
        };
        let second = next_delay(config.initial_delay(), &config);
        assert_eq!(second, Duration::from_secs(4));
        assert_eq!(next_delay(second, &config), Duration::from_secs(5));
    }
}
