//! Synthetic partitioned datasets.
//!
//! One normal sample is sorted and cut into consecutive chunks, so each
//! partition has visibly different local statistics while the pooled data
//! keeps mean 0 and standard deviation equal to the client count.

use crate::core::{Error, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

/// Parameters of a synthetic dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartitionPlan {
    /// Number of partitions
    pub clients: usize,
    /// Rows per partition
    pub rows: usize,
    /// RNG seed
    pub seed: u64,
}

impl Default for PartitionPlan {
    fn default() -> Self {
        Self {
            clients: 3,
            rows: 1000,
            seed: 42,
        }
    }
}

/// Generate `clients` partitions of `rows` values each.
pub fn generate_partitions(plan: &PartitionPlan) -> Result<Vec<Vec<f64>>> {
    if plan.clients == 0 {
        return Err(Error::InvalidConfig("client count must be positive".to_string()));
    }

    let mut rng = StdRng::seed_from_u64(plan.seed);
    let normal = Normal::new(0.0, plan.clients as f64)
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;

    let mut values: Vec<f64> = (0..plan.clients * plan.rows)
        .map(|_| normal.sample(&mut rng))
        .collect();
    values.sort_by(f64::total_cmp);

    Ok(values
        .chunks(plan.rows.max(1))
        .take(plan.clients)
        .map(|chunk| {
            let mut partition = chunk.to_vec();
            partition.shuffle(&mut rng);
            partition
        })
        .collect())
}

/// Write partitions as `<dir>/partition_<i>.csv` with a `value` header.
pub fn write_partitions(dir: impl AsRef<Path>, partitions: &[Vec<f64>]) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(partitions.len());
    for (i, partition) in partitions.iter().enumerate() {
        let path = dir.join(format!("partition_{}.csv", i + 1));

        let mut text = String::from("value\n");
        for value in partition {
            let _ = writeln!(text, "{value}");
        }
        std::fs::write(&path, text)?;

        let n = partition.len().max(1) as f64;
        let mean = partition.iter().sum::<f64>() / n;
        info!(path = %path.display(), rows = partition.len(), mean, "Partition written");
        paths.push(path);
    }

    Ok(paths)
}
