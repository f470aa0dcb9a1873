//! Fixed-width histogram construction.
//!
//! Follows the usual fixed-width convention: `bins + 1` evenly spaced edges,
//! half-open bins except the last one, which also includes its right edge.

use crate::core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Histogram counts together with their bin edges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Per-bin counts
    pub counts: Vec<u64>,
    /// Bin boundaries, `counts.len() + 1` long
    pub edges: Vec<f64>,
}

impl Histogram {
    /// Build a histogram over `values`.
    ///
    /// Without an explicit range the data minimum and maximum are used.
    /// Values outside an explicit range are not counted.
    pub fn build(values: &[f64], bins: usize, range: Option<(f64, f64)>) -> Result<Self> {
        if bins == 0 {
            return Err(Error::InvalidConfig(
                "histogram bin count must be positive".to_string(),
            ));
        }

        let (lo, hi) = match range {
            Some((lo, hi)) => {
                if !lo.is_finite() || !hi.is_finite() || lo > hi {
                    return Err(Error::InvalidConfig(format!(
                        "invalid histogram range [{lo}, {hi}]"
                    )));
                }
                (lo, hi)
            }
            None => data_range(values)?,
        };

        // Degenerate range: widen by half a unit on each side
        let (lo, hi) = if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) };

        let edges = linspace(lo, hi, bins);
        let mut counts = vec![0u64; bins];
        let norm = bins as f64 / (hi - lo);

        for &x in values {
            // Also rejects NaN
            if !(x >= lo && x <= hi) {
                continue;
            }

            let mut idx = (((x - lo) * norm) as usize).min(bins - 1);

            // Floating-point rounding can land one bin off; edges are authoritative.
            if idx > 0 && x < edges[idx] {
                idx -= 1;
            } else if idx + 1 < bins && x >= edges[idx + 1] {
                idx += 1;
            }

            counts[idx] += 1;
        }

        Ok(Self { counts, edges })
    }

    /// Number of bins.
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    /// Total number of counted values.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// The `[min, max]` range covered by the edges.
    pub fn range(&self) -> Option<(f64, f64)> {
        match (self.edges.first(), self.edges.last()) {
            (Some(&lo), Some(&hi)) => Some((lo, hi)),
            _ => None,
        }
    }
}

fn data_range(values: &[f64]) -> Result<(f64, f64)> {
    if values.is_empty() {
        return Ok((0.0, 1.0));
    }

    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &x in values {
        if !x.is_finite() {
            return Err(Error::NonFiniteData);
        }
        lo = lo.min(x);
        hi = hi.max(x);
    }

    Ok((lo, hi))
}

fn linspace(lo: f64, hi: f64, bins: usize) -> Vec<f64> {
    let step = (hi - lo) / bins as f64;
    (0..=bins)
        .map(|i| if i == bins { hi } else { lo + step * i as f64 })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evenly_spaced_edges() {
        let hist = Histogram::build(&[0.0, 10.0], 5, None).unwrap();
        assert_eq!(hist.edges, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(hist.bins(), 5);
    }

    #[test]
    fn test_last_bin_right_inclusive() {
        let hist = Histogram::build(&[0.0, 1.0, 2.0, 3.0, 4.0], 4, Some((0.0, 4.0))).unwrap();
        assert_eq!(hist.counts, vec![1, 1, 1, 2]);
        assert_eq!(hist.total(), 5);
    }

    #[test]
    fn test_values_outside_range_ignored() {
        let hist = Histogram::build(&[-5.0, 0.5, 1.5, 7.0, f64::NAN], 2, Some((0.0, 2.0))).unwrap();
        assert_eq!(hist.counts, vec![1, 1]);
    }

    #[test]
    fn test_empty_data_uses_unit_range() {
        let hist = Histogram::build(&[], 4, None).unwrap();
        assert_eq!(hist.range(), Some((0.0, 1.0)));
        assert_eq!(hist.total(), 0);
    }

    #[test]
    fn test_degenerate_range_widened() {
        let hist = Histogram::build(&[3.0, 3.0, 3.0], 2, None).unwrap();
        assert_eq!(hist.range(), Some((2.5, 3.5)));
        assert_eq!(hist.counts, vec![0, 3]);
    }

    #[test]
    fn test_rounding_respects_edges() {
        // 0.3 sits exactly on an edge that rounds awkwardly in binary.
        let hist = Histogram::build(&[0.3], 10, Some((0.0, 1.0))).unwrap();
        let idx = hist.counts.iter().position(|&c| c == 1).unwrap();
        assert!(hist.edges[idx] <= 0.3 && 0.3 < hist.edges[idx + 1]);
    }

    #[test]
    fn test_non_finite_data_without_range() {
        let result = Histogram::build(&[1.0, f64::INFINITY], 3, None);
        assert!(matches!(result, Err(Error::NonFiniteData)));
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(Histogram::build(&[1.0], 0, None).unwrap_err().is_configuration());
        assert!(Histogram::build(&[1.0], 3, Some((2.0, 1.0)))
            .unwrap_err()
            .is_configuration());
    }
}
