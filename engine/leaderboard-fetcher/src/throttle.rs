//! Politeness pause between leaderboard requests.

use crate::config::ThrottleConfig;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

/// Randomised pause: a fixed minimum plus up to `jitter` extra
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    min_delay: Duration,
    jitter: Duration,
}

impl Throttle {
    pub fn new(min_delay: Duration, jitter: Duration) -> Self {
        Self { min_delay, jitter }
    }

    pub fn from_config(config: &ThrottleConfig) -> Self {
        Self::new(Duration::from_millis(config.min_delay_ms), Duration::from_millis(config.jitter_ms))
    }

    /// No pause at all
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn next_delay(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.min_delay;
        }
        let extra = rand::thread_rng().gen_range(0.0..=1.0);
        self.min_delay + self.jitter.mul_f64(extra)
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if !delay.is_zero() {
            debug!("Sleeping {:?} before next request", delay);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_stays_within_bounds() {
        let throttle = Throttle::from_config(&ThrottleConfig::default());
        for _ in 0..200 {
            let delay = throttle.next_delay();
            assert!(delay >= Duration::from_millis(750));
            assert!(delay <= Duration::from_millis(2750));
        }
    }

    #[test]
    fn test_without_jitter_delay_is_fixed() {
        let throttle = Throttle::new(Duration::from_millis(5), Duration::ZERO);
        assert_eq!(throttle.next_delay(), Duration::from_millis(5));
        assert_eq!(Throttle::none().next_delay(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_sleeps_for_at_least_minimum() {
        let throttle = Throttle::new(Duration::from_secs(1), Duration::from_secs(2));
        let started = tokio::time::Instant::now();
        throttle.pause().await;
        assert!(started.elapsed() >= Duration::from_secs(1));
    }
}
