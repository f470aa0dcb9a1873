//! Per-client sufficient statistics.

use crate::core::{ClientId, Result};
use crate::stats::histogram::Histogram;
use serde::{Deserialize, Serialize};

/// Sufficient statistics a client reports for one round.
///
/// Immutable once produced; mean and variance are derived on demand.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary {
    /// Reporting client
    pub client_id: ClientId,
    /// Number of observations
    pub n: u64,
    /// Σx
    pub sum: f64,
    /// Σx²
    pub sum_sq: f64,
    /// Per-bin counts
    pub hist_counts: Vec<u64>,
    /// Bin boundaries, `hist_counts.len() + 1` long
    pub hist_edges: Vec<f64>,
}

impl ClientSummary {
    /// Summarize local observations.
    pub fn from_values(
        client_id: ClientId,
        values: &[f64],
        bins: usize,
        hist_range: Option<(f64, f64)>,
    ) -> Result<Self> {
        let histogram = Histogram::build(values, bins, hist_range)?;

        Ok(Self {
            client_id,
            n: values.len() as u64,
            sum: values.iter().sum(),
            sum_sq: values.iter().map(|x| x * x).sum(),
            hist_counts: histogram.counts,
            hist_edges: histogram.edges,
        })
    }

    /// Local mean, 0 without observations.
    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.sum / self.n as f64
        }
    }

    /// Local population variance, 0 for fewer than two observations.
    pub fn variance(&self) -> f64 {
        if self.n <= 1 {
            return 0.0;
        }
        let mean = self.mean();
        // Cancellation can push this slightly below zero.
        (self.sum_sq / self.n as f64 - mean * mean).max(0.0)
    }

    /// Local standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Number of histogram bins.
    pub fn bins(&self) -> usize {
        self.hist_counts.len()
    }
}
