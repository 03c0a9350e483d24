//! Exponential backoff for bus reconnection

use std::time::Duration;

use rand::Rng;

/// Exponential backoff configuration
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Initial delay in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier for exponential growth
    pub multiplier: f64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 100,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Exponential backoff calculator with jitter
pub struct ExponentialBackoff {
    config: BackoffConfig,
    next_delay_ms: f64,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new() -> Self {
        Self::with_config(BackoffConfig::default())
    }

    pub fn with_config(config: BackoffConfig) -> Self {
        let initial = config.initial_delay_ms as f64;
        Self {
            config,
            next_delay_ms: initial,
            attempt: 0,
        }
    }

    /// Delay before the next attempt. The first delay is the initial delay;
    /// each following one grows by the multiplier up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt += 1;

        let base = self.next_delay_ms.min(self.config.max_delay_ms as f64);
        self.next_delay_ms = (base * self.config.multiplier).min(self.config.max_delay_ms as f64);

        let delay = if self.config.jitter_factor > 0.0 {
            let jitter_range = base * self.config.jitter_factor;
            let jitter = rand::rng().random_range(-jitter_range..=jitter_range);
            (base + jitter).max(1.0)
        } else {
            base.max(1.0)
        };

        Duration::from_millis(delay as u64)
    }

    /// Reset after a successful connection
    pub fn reset(&mut self) {
        self.next_delay_ms = self.config.initial_delay_ms as f64;
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new()
    }
}
