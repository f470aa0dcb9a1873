//! Client Module
//!
//! Simulated federated clients:
//! - Data sources producing a flat numeric column
//! - The client task computing and emitting a summary

pub mod source;
pub mod task;

pub use source::{CsvColumnSource, DataSource, InMemorySource};
pub use task::{compute_summary, run_client, ClientConfig, ClientOutcome};
