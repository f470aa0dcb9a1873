//! Coordinator Module
//!
//! Runs one bounded-time collection round over a set of clients:
//! - Synchronous barrier collection with an absolute deadline
//! - Streaming collection with a running aggregate and a grace period

pub mod asynchronous;
pub mod config;
pub mod result;
pub mod sync;

pub use asynchronous::AsyncCoordinator;
pub use config::RoundConfig;
pub use result::{RoundMode, RoundProgress, RoundResult, Termination};
pub use sync::SyncCoordinator;

use crate::client::{run_client, ClientConfig, ClientOutcome};
use crate::core::{Error, Result};
use crate::stats::ClientSummary;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default bound on the best-effort join at round end.
pub const DEFAULT_JOIN_GRACE: Duration = Duration::from_millis(100);

/// Check a client set before launching a round.
///
/// Multi-client rounds must share one histogram layout, otherwise counts
/// would be summed position by position over unrelated bins.
pub fn validate_clients(clients: &[ClientConfig]) -> Result<()> {
    let first = clients
        .first()
        .ok_or_else(|| Error::InvalidConfig("a round needs at least one client".to_string()))?;

    let mut seen = HashSet::new();
    for client in clients {
        if !seen.insert(client.client_id) {
            return Err(Error::InvalidConfig(format!(
                "duplicate client id {}",
                client.client_id
            )));
        }
        if client.bins == 0 {
            return Err(Error::InvalidConfig(format!(
                "client {} has zero histogram bins",
                client.client_id
            )));
        }
        if let Some((lo, hi)) = client.hist_range {
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(Error::InvalidConfig(format!(
                    "client {} has invalid histogram range [{lo}, {hi}]",
                    client.client_id
                )));
            }
        }
        client.faults.validate()?;
    }

    if clients.len() > 1 {
        if first.hist_range.is_none() {
            return Err(Error::InvalidConfig(
                "multi-client rounds need a shared histogram range".to_string(),
            ));
        }
        if let Some(other) = clients
            .iter()
            .find(|c| c.bins != first.bins || c.hist_range != first.hist_range)
        {
            return Err(Error::InvalidConfig(format!(
                "client {} histogram layout differs from client {}",
                other.client_id, first.client_id
            )));
        }
    }

    Ok(())
}

/// Spawn one task per client, all writing to the same channel.
fn launch_clients(
    clients: Vec<ClientConfig>,
    tx: &UnboundedSender<ClientSummary>,
) -> Vec<JoinHandle<ClientOutcome>> {
    clients
        .into_iter()
        .map(|config| tokio::spawn(run_client(config, tx.clone())))
        .collect()
}

/// Give all client tasks one short, shared chance to finish.
///
/// Tasks still running afterwards are detached, not aborted.
async fn join_with_grace(handles: Vec<JoinHandle<ClientOutcome>>, grace: Duration) {
    let total = handles.len();
    match tokio::time::timeout(grace, futures::future::join_all(handles)).await {
        Ok(outcomes) => {
            let sent = outcomes
                .iter()
                .filter(|o| matches!(o, Ok(ClientOutcome::Sent)))
                .count();
            debug!(total, sent, "All client tasks finished");
        }
        Err(_) => debug!(total, "Leaving unfinished client tasks behind"),
    }
}
