//! Fault Module
//!
//! Simulated client unreliability: random delay followed by a random drop.

pub mod injector;

pub use injector::{FaultConfig, FaultDecision, FaultInjector};
