//! Merge algebra for client summaries.
//!
//! Merging is a pure fold: sums of `n`, Σx, Σx² and element-wise sums of
//! histogram counts. Summaries are folded in a canonical order, so the
//! result is bit-identical for every permutation of the input.

use crate::core::{Error, Result};
use crate::stats::summary::ClientSummary;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Relative tolerance when comparing bin edges of different clients.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Global estimate derived from the summaries received so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GlobalAggregate {
    /// Total observations
    pub n: u64,
    /// Global Σx
    pub sum: f64,
    /// Global Σx²
    pub sum_sq: f64,
    /// Global mean, 0 when empty
    pub mean: f64,
    /// Global population variance, 0 when empty
    pub variance: f64,
    /// Element-wise summed histogram counts
    pub hist_counts: Vec<u64>,
    /// Shared bin boundaries
    pub hist_edges: Vec<f64>,
}

impl GlobalAggregate {
    /// The zero-state aggregate of an empty summary set.
    pub fn empty() -> Self {
        Self {
            n: 0,
            sum: 0.0,
            sum_sq: 0.0,
            mean: 0.0,
            variance: 0.0,
            hist_counts: Vec::new(),
            hist_edges: Vec::new(),
        }
    }

    /// Whether the aggregate carries no observations ("no data").
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Global standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

impl Default for GlobalAggregate {
    fn default() -> Self {
        Self::empty()
    }
}

/// Merge any number of summaries into a global aggregate.
///
/// All summaries must share one histogram layout: equal bin counts and
/// matching edges. Anything else is a configuration error.
pub fn merge_summaries(summaries: &[ClientSummary]) -> Result<GlobalAggregate> {
    if summaries.is_empty() {
        return Ok(GlobalAggregate::empty());
    }

    let mut ordered: Vec<&ClientSummary> = summaries.iter().collect();
    ordered.sort_by(|a, b| canonical_order(a, b));

    let reference = ordered[0];
    check_layout(reference)?;
    let bins = reference.hist_counts.len();

    let mut n = 0u64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut hist_counts = vec![0u64; bins];

    for summary in ordered {
        check_layout(summary)?;
        if summary.hist_counts.len() != bins {
            return Err(Error::HistogramLengthMismatch {
                expected: bins,
                actual: summary.hist_counts.len(),
            });
        }
        if !edges_match(&reference.hist_edges, &summary.hist_edges) {
            return Err(Error::HistogramEdgeMismatch(summary.client_id));
        }

        n += summary.n;
        sum += summary.sum;
        sum_sq += summary.sum_sq;
        for (total, count) in hist_counts.iter_mut().zip(&summary.hist_counts) {
            *total += count;
        }
    }

    let (mean, variance) = if n == 0 {
        (0.0, 0.0)
    } else {
        let mean = sum / n as f64;
        (mean, (sum_sq / n as f64 - mean * mean).max(0.0))
    };

    Ok(GlobalAggregate {
        n,
        sum,
        sum_sq,
        mean,
        variance,
        hist_counts,
        hist_edges: reference.hist_edges.clone(),
    })
}

fn canonical_order(a: &ClientSummary, b: &ClientSummary) -> Ordering {
    a.client_id
        .cmp(&b.client_id)
        .then(a.n.cmp(&b.n))
        .then(a.sum.total_cmp(&b.sum))
        .then(a.sum_sq.total_cmp(&b.sum_sq))
}

fn check_layout(summary: &ClientSummary) -> Result<()> {
    if summary.hist_edges.len() != summary.hist_counts.len() + 1 {
        return Err(Error::InvalidConfig(format!(
            "client {} reports {} bins with {} edges",
            summary.client_id,
            summary.hist_counts.len(),
            summary.hist_edges.len()
        )));
    }
    Ok(())
}

fn edges_match(reference: &[f64], edges: &[f64]) -> bool {
    reference.len() == edges.len()
        && reference
            .iter()
            .zip(edges)
            .all(|(a, b)| (a - b).abs() <= EDGE_TOLERANCE * a.abs().max(b.abs()).max(1.0))
}

/// Running aggregate over summaries as they arrive.
///
/// Keeps the received set immutable and re-folds it on every push.
#[derive(Clone, Debug, Default)]
pub struct SummaryAggregator {
    received: Vec<ClientSummary>,
}

impl SummaryAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one summary and return the updated aggregate.
    ///
    /// A summary that does not fit the layout of the others is rejected
    /// and not retained.
    pub fn push(&mut self, summary: ClientSummary) -> Result<GlobalAggregate> {
        self.received.push(summary);
        match merge_summaries(&self.received) {
            Ok(aggregate) => Ok(aggregate),
            Err(err) => {
                self.received.pop();
                Err(err)
            }
        }
    }

    /// Aggregate over everything received so far.
    pub fn aggregate(&self) -> Result<GlobalAggregate> {
        merge_summaries(&self.received)
    }

    /// Number of summaries received.
    pub fn len(&self) -> usize {
        self.received.len()
    }

    /// Whether nothing has been received.
    pub fn is_empty(&self) -> bool {
        self.received.is_empty()
    }

    /// Received summaries in arrival order.
    pub fn summaries(&self) -> &[ClientSummary] {
        &self.received
    }

    /// Consume the aggregator, returning the received summaries.
    pub fn into_summaries(self) -> Vec<ClientSummary> {
        self.received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RANGE: Option<(f64, f64)> = Some((-10.0, 10.0));

    fn summary(client_id: u32, values: &[f64]) -> ClientSummary {
        ClientSummary::from_values(client_id, values, 4, RANGE).unwrap()
    }

    fn sample_set() -> Vec<ClientSummary> {
        vec![
            summary(1, &[0.1, -2.7, 3.3, 9.9]),
            summary(2, &[-7.25, 1.0 / 3.0]),
            summary(3, &[4.4, 4.4, -0.01, 6.02e-3, 2.2]),
        ]
    }

    #[test]
    fn test_merge_empty() {
        let agg = merge_summaries(&[]).unwrap();
        assert_eq!(agg.n, 0);
        assert_eq!(agg.mean, 0.0);
        assert_eq!(agg.variance, 0.0);
        assert!(agg.is_empty());
        assert!(agg.hist_counts.is_empty());
    }

    #[test]
    fn test_merge_matches_pooled_statistics() {
        let pooled = [1.0, 2.0, 3.0, -4.0, 5.0, 6.0];
        let parts = vec![summary(1, &pooled[..2]), summary(2, &pooled[2..])];
        let agg = merge_summaries(&parts).unwrap();
        let whole = summary(9, &pooled);

        assert_eq!(agg.n, 6);
        assert!((agg.mean - whole.mean()).abs() < 1e-12);
        assert!((agg.variance - whole.variance()).abs() < 1e-12);
        assert_eq!(agg.hist_counts, whole.hist_counts);
        assert_eq!(agg.hist_edges, whole.hist_edges);
    }

    #[test]
    fn test_merge_is_order_independent() {
        let set = sample_set();
        let reference = merge_summaries(&set).unwrap();

        let permutations = [[0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for perm in permutations {
            let shuffled: Vec<ClientSummary> = perm.iter().map(|&i| set[i].clone()).collect();
            assert_eq!(merge_summaries(&shuffled).unwrap(), reference);
        }
    }

    #[test]
    fn test_merge_is_associative() {
        let set = sample_set();
        let left = merge_summaries(&set[..2]).unwrap();
        let all = merge_summaries(&set).unwrap();
        let combined = ClientSummary {
            client_id: 0,
            n: left.n,
            sum: left.sum,
            sum_sq: left.sum_sq,
            hist_counts: left.hist_counts,
            hist_edges: left.hist_edges,
        };
        let regrouped = merge_summaries(&[combined, set[2].clone()]).unwrap();

        assert_eq!(regrouped.n, all.n);
        assert!((regrouped.mean - all.mean).abs() < 1e-12);
        assert!((regrouped.variance - all.variance).abs() < 1e-12);
        assert_eq!(regrouped.hist_counts, all.hist_counts);
    }

    #[test]
    fn test_empty_members_do_not_shift_statistics() {
        let agg = merge_summaries(&[summary(1, &[]), summary(2, &[2.0, 4.0])]).unwrap();
        assert_eq!(agg.n, 2);
        assert_eq!(agg.mean, 3.0);
        assert_eq!(agg.variance, 1.0);
    }

    #[test]
    fn test_variance_never_negative() {
        let adversarial = ClientSummary {
            client_id: 1,
            n: 3,
            sum: 3.0000000000000004,
            sum_sq: 3.0,
            hist_counts: vec![3],
            hist_edges: vec![0.0, 2.0],
        };
        let agg = merge_summaries(&[adversarial]).unwrap();
        assert_eq!(agg.variance, 0.0);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let a = summary(1, &[1.0]);
        let b = ClientSummary::from_values(2, &[1.0], 5, RANGE).unwrap();
        let err = merge_summaries(&[a, b]).unwrap_err();
        assert!(matches!(err, Error::HistogramLengthMismatch { expected: 4, actual: 5 }));
    }

    #[test]
    fn test_edge_mismatch_rejected() {
        let a = ClientSummary::from_values(1, &[0.0, 1.0], 2, None).unwrap();
        let b = ClientSummary::from_values(2, &[5.0, 9.0], 2, None).unwrap();
        let err = merge_summaries(&[a, b]).unwrap_err();
        assert!(matches!(err, Error::HistogramEdgeMismatch(2)));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_running_aggregate_matches_full_merge() {
        let set = sample_set();
        let mut running = SummaryAggregator::new();
        let mut last = GlobalAggregate::empty();
        for s in &set {
            last = running.push(s.clone()).unwrap();
        }

        assert_eq!(running.len(), 3);
        assert_eq!(last, merge_summaries(&set).unwrap());
        assert_eq!(running.aggregate().unwrap(), last);
    }

    #[test]
    fn test_running_aggregate_rejects_bad_layout() {
        let mut running = SummaryAggregator::new();
        running.push(summary(1, &[1.0])).unwrap();

        let bad = ClientSummary::from_values(2, &[1.0], 3, RANGE).unwrap();
        assert!(running.push(bad).is_err());
        assert_eq!(running.len(), 1);
        assert_eq!(running.summaries()[0].client_id, 1);
    }
}
