//! Randomized pacing between requests
//!
//! Perfectly periodic request timing is an easy automation fingerprint. Each
//! pause is drawn from a normal distribution and clipped to
//! `[0, mean + 3·std]`, which keeps the jitter without an unbounded tail.

use crate::config::PacingConfig;
use crate::crawler::TerminationSignal;
use crate::ConfigError;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::time::Duration;

/// Truncated-Gaussian delay policy, configured per worker
#[derive(Debug, Clone)]
pub struct Pacing {
    mean: f64,
    std: f64,
    normal: Option<Normal<f64>>,
}

impl Pacing {
    /// Creates a pacing policy from a mean and standard deviation in seconds
    ///
    /// # Returns
    ///
    /// * `Ok(Pacing)` - Valid parameters
    /// * `Err(ConfigError)` - Negative or non-finite parameters
    pub fn new(mean_seconds: f64, std_seconds: f64) -> Result<Self, ConfigError> {
        if !mean_seconds.is_finite() || mean_seconds < 0.0 {
            return Err(ConfigError::Validation(format!(
                "pacing mean must be finite and >= 0, got {}",
                mean_seconds
            )));
        }

        let normal = if std_seconds == 0.0 {
            None
        } else {
            let normal = Normal::new(mean_seconds, std_seconds).map_err(|e| {
                ConfigError::Validation(format!("invalid pacing std {}: {}", std_seconds, e))
            })?;
            Some(normal)
        };

        Ok(Self {
            mean: mean_seconds,
            std: std_seconds,
            normal,
        })
    }

    /// Builds a policy from the `[pacing]` configuration section
    pub fn from_config(config: &PacingConfig) -> Result<Self, ConfigError> {
        Self::new(config.mean_seconds, config.std_seconds)
    }

    /// A policy that never sleeps
    pub fn none() -> Self {
        Self {
            mean: 0.0,
            std: 0.0,
            normal: None,
        }
    }

    /// Largest single draw, in seconds
    pub fn upper_bound(&self) -> f64 {
        self.mean + 3.0 * self.std
    }

    /// Draws the total delay for `times` consecutive pauses
    pub fn sample_with<R: Rng + ?Sized>(&self, times: u32, rng: &mut R) -> Duration {
        let upper = self.upper_bound();
        let total: f64 = (0..times)
            .map(|_| {
                let draw = match &self.normal {
                    Some(normal) => normal.sample(rng),
                    None => self.mean,
                };
                draw.clamp(0.0, upper)
            })
            .sum();

        Duration::try_from_secs_f64(total).unwrap_or(Duration::MAX)
    }

    /// Draws the total delay for `times` consecutive pauses using the thread RNG
    pub fn sample(&self, times: u32) -> Duration {
        self.sample_with(times, &mut rand::rng())
    }

    /// Sleeps for a randomized delay, waking early on termination
    ///
    /// # Returns
    ///
    /// `true` if the termination signal is set when the sleep ends
    pub fn sleep(&self, times: u32, signal: &TerminationSignal) -> bool {
        let delay = self.sample(times);
        if delay.is_zero() {
            return signal.is_set();
        }

        tracing::trace!("Pacing for {:?}", delay);
        signal.wait_timeout(delay)
    }
}
