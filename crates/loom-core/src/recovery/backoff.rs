//! Exponential backoff with jitter

use std::time::Duration;

use rand::Rng;

/// Configuration for backoff behavior
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Add random jitter to prevent thundering herd
    pub jitter: bool,
    /// Maximum jitter ratio (0.0 - 1.0)
    pub jitter_ratio: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
            jitter_ratio: 0.1,
        }
    }
}

/// Exponential backoff: `base_delay * multiplier^(attempt - 1)`, capped at
/// `max_delay`, then optionally perturbed by up to `±jitter_ratio`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    pub fn with_config(config: BackoffConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackoffConfig {
        &self.config
    }

    /// Delay after the given failed attempt (1-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base = self.config.base_delay.as_secs_f64() * self.config.multiplier.powi(exponent);
        let capped = base.min(self.config.max_delay.as_secs_f64());

        self.add_jitter(Duration::from_secs_f64(capped.max(0.0)))
    }

    fn add_jitter(&self, delay: Duration) -> Duration {
        if !self.config.jitter || self.config.jitter_ratio <= 0.0 {
            return delay;
        }

        let range = delay.as_secs_f64() * self.config.jitter_ratio;
        if range <= 0.0 {
            return delay;
        }
        let jitter = rand::thread_rng().gen_range(-range..=range);

        Duration::from_secs_f64((delay.as_secs_f64() + jitter).max(0.0))
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_jitter(base_ms: u64, max_secs: u64) -> ExponentialBackoff {
        ExponentialBackoff::with_config(BackoffConfig {
            base_delay: Duration::from_millis(base_ms),
            max_delay: Duration::from_secs(max_secs),
            multiplier: 2.0,
            jitter: false,
            jitter_ratio: 0.0,
        })
    }

    #[test]
    fn test_exponential_backoff_delays() {
        let backoff = no_jitter(1000, 30);

        assert_eq!(backoff.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_secs(8));
    }

    #[test]
    fn test_exponential_backoff_cap() {
        let backoff = no_jitter(1000, 5);

        // 2^9 seconds without the cap
        assert_eq!(backoff.delay_for_attempt(10), Duration::from_secs(5));
        assert_eq!(backoff.delay_for_attempt(u32::MAX), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_within_ratio() {
        let backoff = ExponentialBackoff::with_config(BackoffConfig {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: true,
            jitter_ratio: 0.1,
        });

        for _ in 0..200 {
            let delay = backoff.delay_for_attempt(1).as_secs_f64();
            assert!((9.0 - 1e-9..=11.0 + 1e-9).contains(&delay), "delay {}", delay);
        }
    }
}
