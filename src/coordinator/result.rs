//! Round outcomes and progress reports.

use crate::core::types::duration_secs;
use crate::core::{ClientId, RoundId, Timestamp};
use crate::stats::{ClientSummary, GlobalAggregate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Collection strategy used for a round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundMode {
    /// Barrier with an absolute deadline
    Sync,
    /// Streaming with a grace period after the last arrival
    Async,
}

impl std::fmt::Display for RoundMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundMode::Sync => write!(f, "sync"),
            RoundMode::Async => write!(f, "async"),
        }
    }
}

/// Why collection stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Every expected client reported
    AllResponded,
    /// The round timeout passed
    Timeout,
    /// No arrivals for the grace period after the last one
    GraceElapsed,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::AllResponded => write!(f, "all clients responded"),
            Termination::Timeout => write!(f, "overall timeout reached"),
            Termination::GraceElapsed => write!(f, "grace period after last update elapsed"),
        }
    }
}

/// Immutable outcome of one round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundResult {
    /// Round identifier
    pub round_id: RoundId,
    /// Collection strategy
    pub mode: RoundMode,
    /// Wall-clock start of the round
    pub started_at: Timestamp,
    /// Number of clients launched
    pub expected: usize,
    /// Summaries received, in arrival order
    pub summaries: Vec<ClientSummary>,
    /// `expected - received`
    pub dropped: usize,
    /// Elapsed wall time
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    /// Why collection stopped
    pub termination: Termination,
    /// Aggregate over the received summaries
    pub aggregate: GlobalAggregate,
}

impl RoundResult {
    /// Number of summaries received.
    pub fn received(&self) -> usize {
        self.summaries.len()
    }

    /// Fraction of launched clients that reported.
    pub fn success_rate(&self) -> f64 {
        if self.expected == 0 {
            0.0
        } else {
            self.received() as f64 / self.expected as f64
        }
    }

    /// IDs of the clients that reported, in arrival order.
    pub fn received_ids(&self) -> Vec<ClientId> {
        self.summaries.iter().map(|s| s.client_id).collect()
    }
}

/// Running view emitted after each arrival in a streaming round.
#[derive(Clone, Debug)]
pub struct RoundProgress {
    /// Client whose summary just arrived
    pub client_id: ClientId,
    /// Summaries received so far
    pub received: usize,
    /// Clients launched
    pub expected: usize,
    /// Time since the round started
    pub elapsed: Duration,
    /// Aggregate over everything received so far
    pub aggregate: GlobalAggregate,
}
