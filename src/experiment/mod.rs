//! Experiment Module
//!
//! Tooling around single rounds:
//! - Synthetic partitioned datasets
//! - Sweeps over drop probabilities in both collection modes
//! - Machine-readable STATS lines and results tables

pub mod partition;
pub mod report;
pub mod runner;

pub use partition::{generate_partitions, write_partitions, PartitionPlan};
pub use report::{stats_line, summary_text, write_results_csv, ExperimentRecord};
pub use runner::{ExperimentPlan, ExperimentRunner};
