//! Statistics Module
//!
//! Sufficient statistics and their merge algebra:
//! - Fixed-width histograms
//! - Per-client summaries (n, Σx, Σx², histogram)
//! - Order-independent merging into a global aggregate

pub mod aggregator;
pub mod histogram;
pub mod summary;

pub use aggregator::{merge_summaries, GlobalAggregate, SummaryAggregator};
pub use histogram::Histogram;
pub use summary::ClientSummary;
