//! # SimuFed - Federated statistical aggregation
//!
//! Simulates one round of federated aggregation: a coordinator gathers
//! locally computed summary statistics from unreliable clients and merges
//! them into a global estimate without seeing raw data.
//!
//! - **stats**: sufficient statistics and their order-independent merge
//! - **fault**: random delay and drop of client updates
//! - **client**: data sources and the client task
//! - **coordinator**: synchronous (barrier) and asynchronous (streaming) rounds
//! - **experiment**: synthetic partitions, sweeps and reports
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use simufed::client::{ClientConfig, InMemorySource};
//! use simufed::coordinator::SyncCoordinator;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let clients = (1..=3)
//!         .map(|id| {
//!             let data = InMemorySource::new(vec![id as f64, -(id as f64)]);
//!             ClientConfig::new(id, Arc::new(data)).with_hist_range(-5.0, 5.0)
//!         })
//!         .collect();
//!
//!     let coordinator = SyncCoordinator::new(Duration::from_secs(5));
//!     let result = coordinator.run_round(clients).await.unwrap();
//!     println!("global mean: {}", result.aggregate.mean);
//! }
//! ```

pub mod client;
pub mod coordinator;
pub mod core;
pub mod experiment;
pub mod fault;
pub mod monitoring;
pub mod stats;

pub use crate::core::error::{Error, Result};
