//! The client task: summarize local data, consult the fault injector, emit.

use crate::client::source::DataSource;
use crate::core::{ClientId, Result};
use crate::fault::{FaultConfig, FaultInjector};
use crate::stats::ClientSummary;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

/// Default number of histogram bins.
pub const DEFAULT_BINS: usize = 10;

/// Per-client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Client identity
    pub client_id: ClientId,
    /// Local observations
    pub source: Arc<dyn DataSource>,
    /// Histogram bin count
    pub bins: usize,
    /// Shared histogram range; derived from local data when absent
    pub hist_range: Option<(f64, f64)>,
    /// Fault parameters
    pub faults: FaultConfig,
}

impl ClientConfig {
    /// Create a reliable client with default binning.
    pub fn new(client_id: ClientId, source: Arc<dyn DataSource>) -> Self {
        Self {
            client_id,
            source,
            bins: DEFAULT_BINS,
            hist_range: None,
            faults: FaultConfig::default(),
        }
    }

    /// Set histogram bin count.
    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins;
        self
    }

    /// Pin the histogram range.
    pub fn with_hist_range(mut self, min: f64, max: f64) -> Self {
        self.hist_range = Some((min, max));
        self
    }

    /// Set fault parameters.
    pub fn with_faults(mut self, faults: FaultConfig) -> Self {
        self.faults = faults;
        self
    }
}

/// How a client task ended. Invisible to the coordinator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientOutcome {
    /// Summary handed to the channel
    Sent,
    /// Withheld by the fault injector
    Dropped,
    /// Data could not be loaded or summarized
    Failed,
    /// Coordinator had already closed the round
    Abandoned,
}

/// Load the client's data and compute its summary.
pub async fn compute_summary(config: &ClientConfig) -> Result<ClientSummary> {
    let values = config.source.load().await?;
    ClientSummary::from_values(config.client_id, &values, config.bins, config.hist_range)
}

/// Run one client to completion.
///
/// Every failure is local: the task simply does not emit.
pub async fn run_client(
    config: ClientConfig,
    tx: UnboundedSender<ClientSummary>,
) -> ClientOutcome {
    let client_id = config.client_id;

    let summary = match compute_summary(&config).await {
        Ok(summary) => summary,
        Err(err) => {
            warn!(client_id, source = %config.source.describe(), error = %err, "Failed to summarize local data");
            return ClientOutcome::Failed;
        }
    };

    let decision = FaultInjector::new(config.faults.clone())
        .delay_then_decide()
        .await;

    if decision.dropped {
        info!(client_id, delay_ms = decision.delay.as_millis() as u64, "Dropped update");
        return ClientOutcome::Dropped;
    }

    let n = summary.n;
    match tx.send(summary) {
        Ok(()) => {
            info!(client_id, n, delay_ms = decision.delay.as_millis() as u64, "Sent summary");
            ClientOutcome::Sent
        }
        Err(_) => {
            debug!(client_id, "Round already closed, summary discarded");
            ClientOutcome::Abandoned
        }
    }
}
