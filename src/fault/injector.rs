//! Fault injection for simulated clients.
//!
//! A client first sleeps for a delay drawn uniformly from `[0, max_delay]`,
//! then draws whether its update is dropped. The delay always runs to
//! completion, even when the outcome is a drop.

use crate::core::types::duration_secs;
use crate::core::{Error, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-client fault parameters, fixed for the duration of a round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaultConfig {
    /// Probability in `[0, 1]` that an update is dropped
    pub drop_probability: f64,
    /// Upper bound of the artificial delay
    #[serde(with = "duration_secs")]
    pub max_delay: Duration,
}

impl FaultConfig {
    /// Create a validated fault configuration.
    pub fn new(drop_probability: f64, max_delay: Duration) -> Result<Self> {
        let config = Self {
            drop_probability,
            max_delay,
        };
        config.validate()?;
        Ok(config)
    }

    /// A reliable client: no delay, never dropped.
    pub fn reliable() -> Self {
        Self {
            drop_probability: 0.0,
            max_delay: Duration::ZERO,
        }
    }

    /// Check that the drop probability lies in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.drop_probability) {
            return Err(Error::InvalidConfig(format!(
                "drop probability {} outside [0, 1]",
                self.drop_probability
            )));
        }
        Ok(())
    }
}

impl Default for FaultConfig {
    fn default() -> Self {
        Self::reliable()
    }
}

/// Outcome of one fault-injection step.
#[derive(Clone, Debug, PartialEq)]
pub struct FaultDecision {
    /// Delay that was slept before deciding
    pub delay: Duration,
    /// Whether the update is withheld
    pub dropped: bool,
}

/// Decides per invocation whether to delay and whether to drop.
#[derive(Clone, Debug, Default)]
pub struct FaultInjector {
    config: FaultConfig,
}

impl FaultInjector {
    /// Create an injector for a fault configuration.
    pub fn new(config: FaultConfig) -> Self {
        Self { config }
    }

    /// The configuration this injector applies.
    pub fn config(&self) -> &FaultConfig {
        &self.config
    }

    /// Draw a delay uniformly from `[0, max_delay]`.
    pub fn sample_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let max = self.config.max_delay.as_secs_f64();
        if max <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(rng.gen_range(0.0..=max))
    }

    /// Draw the drop decision: dropped iff a uniform `[0, 1)` draw falls below the probability.
    pub fn sample_drop<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        rng.gen::<f64>() < self.config.drop_probability
    }

    /// Sleep for a random delay, then decide whether to drop.
    ///
    /// Only the calling task is suspended.
    pub async fn delay_then_decide(&self) -> FaultDecision {
        let mut rng = StdRng::from_entropy();
        self.delay_then_decide_with(&mut rng).await
    }

    /// Same as [`delay_then_decide`](Self::delay_then_decide) with a caller-provided RNG.
    pub async fn delay_then_decide_with<R: Rng + Send + ?Sized>(&self, rng: &mut R) -> FaultDecision {
        let delay = self.sample_delay(rng);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let dropped = self.sample_drop(rng);
        FaultDecision { delay, dropped }
    }
}
