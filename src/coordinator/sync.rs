//! Synchronous (barrier-style) round coordinator.
//!
//! Launches every client, polls the shared channel until all summaries are
//! in or the absolute deadline passes, then aggregates whatever arrived.

use crate::client::ClientConfig;
use crate::coordinator::result::{RoundMode, RoundResult, Termination};
use crate::coordinator::{join_with_grace, launch_clients, validate_clients, DEFAULT_JOIN_GRACE};
use crate::core::{now, Result, RoundId};
use crate::stats::merge_summaries;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use tracing::{debug, info};

/// Default channel poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Barrier-style coordinator with a fixed round deadline.
#[derive(Clone, Debug)]
pub struct SyncCoordinator {
    timeout: Duration,
    poll_interval: Duration,
    join_grace: Duration,
}

impl SyncCoordinator {
    /// Create a coordinator with a round timeout.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
            join_grace: DEFAULT_JOIN_GRACE,
        }
    }

    /// Set the channel poll interval. Affects only how fast arrivals are noticed.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the best-effort join bound applied at round end.
    pub fn with_join_grace(mut self, join_grace: Duration) -> Self {
        self.join_grace = join_grace;
        self
    }

    /// Round timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run one round.
    ///
    /// Partial or empty collection is a valid result; only configuration
    /// errors are returned as `Err`.
    pub async fn run_round(&self, clients: Vec<ClientConfig>) -> Result<RoundResult> {
        validate_clients(&clients)?;

        let round_id = RoundId::generate();
        let expected = clients.len();
        let started_at = now();
        let start = Instant::now();
        let deadline = start + self.timeout;

        // Launching. The coordinator keeps `tx` until collection ends.
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handles = launch_clients(clients, &tx);
        info!(%round_id, expected, timeout_s = self.timeout.as_secs_f64(), "Sync round started");

        // Collecting
        let mut received = Vec::with_capacity(expected);
        let termination = loop {
            if received.len() >= expected {
                break Termination::AllResponded;
            }
            let current = Instant::now();
            if current >= deadline {
                break Termination::Timeout;
            }

            let wait = self.poll_interval.min(deadline - current);
            match timeout(wait, rx.recv()).await {
                Ok(Some(summary)) => {
                    debug!(client_id = summary.client_id, received = received.len() + 1, expected, "Summary received");
                    received.push(summary);
                }
                Ok(None) => tokio::time::sleep(wait).await,
                Err(_) => {}
            }
        };
        drop(rx);
        drop(tx);

        join_with_grace(handles, self.join_grace).await;

        // Aggregating
        let aggregate = merge_summaries(&received)?;
        let duration = start.elapsed();
        let dropped = expected - received.len();

        info!(
            %round_id,
            received = received.len(),
            dropped,
            duration_s = duration.as_secs_f64(),
            reason = %termination,
            "Sync round complete"
        );

        Ok(RoundResult {
            round_id,
            mode: RoundMode::Sync,
            started_at,
            expected,
            summaries: received,
            dropped,
            duration,
            termination,
            aggregate,
        })
    }
}

impl Default for SyncCoordinator {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}
