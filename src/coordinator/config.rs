//! Round configuration.
//!
//! File- or CLI-driven description of a round, expanded into per-client
//! configurations reading `<dataset_dir>/<file_prefix><id>.csv`.

use crate::client::{ClientConfig, CsvColumnSource};
use crate::core::types::duration_secs;
use crate::core::{ClientId, Error, Result};
use crate::fault::FaultConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Round configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoundConfig {
    /// Number of clients
    pub clients: usize,
    /// Directory holding one CSV partition per client
    pub dataset_dir: PathBuf,
    /// Partition file name prefix
    pub file_prefix: String,
    /// Column to aggregate
    pub column: String,
    /// Histogram bin count
    pub bins: usize,
    /// Shared histogram range `[min, max]`, required with more than one client
    pub hist_range: Option<[f64; 2]>,
    /// Fault parameters applied to every client
    pub faults: FaultConfig,
    /// Round timeout
    #[serde(with = "duration_secs")]
    pub timeout: Duration,
    /// Silence after the last arrival that closes a streaming round
    #[serde(with = "duration_secs")]
    pub grace_period: Duration,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            clients: 3,
            dataset_dir: PathBuf::from("datasets"),
            file_prefix: "partition_".to_string(),
            column: "value".to_string(),
            bins: 10,
            hist_range: Some([-15.0, 15.0]),
            faults: FaultConfig::default(),
            timeout: Duration::from_secs(5),
            grace_period: Duration::from_secs(1),
        }
    }
}

impl RoundConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the parameters that do not depend on client data.
    pub fn validate(&self) -> Result<()> {
        if self.clients == 0 {
            return Err(Error::InvalidConfig("client count must be positive".to_string()));
        }
        if self.bins == 0 {
            return Err(Error::InvalidConfig("bin count must be positive".to_string()));
        }
        match self.hist_range {
            Some([lo, hi]) if !lo.is_finite() || !hi.is_finite() || lo > hi => {
                return Err(Error::InvalidConfig(format!(
                    "invalid histogram range [{lo}, {hi}]"
                )));
            }
            None if self.clients > 1 => {
                return Err(Error::InvalidConfig(
                    "multi-client rounds need a shared histogram range".to_string(),
                ));
            }
            _ => {}
        }
        self.faults.validate()
    }

    /// Path of a client's partition file.
    pub fn partition_path(&self, client_id: ClientId) -> PathBuf {
        self.dataset_dir
            .join(format!("{}{}.csv", self.file_prefix, client_id))
    }

    /// Per-client configurations with ids `1..=clients`.
    pub fn client_configs(&self) -> Vec<ClientConfig> {
        (1..=self.clients as ClientId)
            .map(|id| {
                let source = CsvColumnSource::new(self.partition_path(id), &self.column);
                let mut config = ClientConfig::new(id, Arc::new(source))
                    .with_bins(self.bins)
                    .with_faults(self.faults.clone());
                if let Some([lo, hi]) = self.hist_range {
                    config = config.with_hist_range(lo, hi);
                }
                config
            })
            .collect()
    }
}
