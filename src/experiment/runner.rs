//! Experiment sweeps.
//!
//! Runs one round per (mode, drop probability) pair against the same
//! dataset and collects a record per round.

use crate::coordinator::{AsyncCoordinator, RoundConfig, RoundMode, RoundResult, SyncCoordinator};
use crate::core::{Error, Result};
use crate::experiment::report::ExperimentRecord;
use crate::fault::FaultConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// A sweep over drop probabilities.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExperimentPlan {
    /// Settings shared by every round; its drop probability is overridden
    pub base: RoundConfig,
    /// Drop probabilities to sweep
    pub drop_probabilities: Vec<f64>,
    /// Collection modes to run, in order
    pub modes: Vec<RoundMode>,
}

impl Default for ExperimentPlan {
    fn default() -> Self {
        Self {
            base: RoundConfig {
                clients: 5,
                faults: FaultConfig {
                    drop_probability: 0.0,
                    max_delay: Duration::from_secs(3),
                },
                ..Default::default()
            },
            drop_probabilities: vec![0.0, 0.5, 0.8],
            modes: vec![RoundMode::Sync, RoundMode::Async],
        }
    }
}

/// Runs an experiment plan round by round.
pub struct ExperimentRunner {
    plan: ExperimentPlan,
}

impl ExperimentRunner {
    /// Create a runner for a plan.
    pub fn new(plan: ExperimentPlan) -> Self {
        Self { plan }
    }

    /// The plan being run.
    pub fn plan(&self) -> &ExperimentPlan {
        &self.plan
    }

    /// Run a single round.
    pub async fn run_one(&self, mode: RoundMode, drop_probability: f64) -> Result<RoundResult> {
        let mut config = self.plan.base.clone();
        config.faults.drop_probability = drop_probability;
        config.validate()?;

        match mode {
            RoundMode::Sync => {
                SyncCoordinator::new(config.timeout)
                    .run_round(config.client_configs())
                    .await
            }
            RoundMode::Async => {
                AsyncCoordinator::new(config.timeout, config.grace_period)
                    .run_round(config.client_configs())
                    .await
            }
        }
    }

    /// Run every round of the plan sequentially. A round that fails is
    /// logged and left out of the records.
    pub async fn run(&self) -> Result<Vec<ExperimentRecord>> {
        if self.plan.drop_probabilities.is_empty() || self.plan.modes.is_empty() {
            return Err(Error::InvalidConfig(
                "experiment plan has no rounds".to_string(),
            ));
        }

        let mut records = Vec::new();
        for &mode in &self.plan.modes {
            for &drop_prob in &self.plan.drop_probabilities {
                let result = match self.run_one(mode, drop_prob).await {
                    Ok(result) => result,
                    Err(e) => {
                        warn!(%mode, drop_prob, error = %e, "Experiment round failed; skipping");
                        continue;
                    }
                };
                info!(
                    %mode,
                    drop_prob,
                    received = result.received(),
                    dropped = result.dropped,
                    "Experiment round finished"
                );
                records.push(ExperimentRecord::from_result(drop_prob, &result));
            }
        }
        Ok(records)
    }
}
