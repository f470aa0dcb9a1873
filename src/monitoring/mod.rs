//! Monitoring Module
//!
//! Structured logging setup for SimuFed binaries and tests.

pub mod logging;

pub use logging::{init_logging, LogFormat, LogLevel, LoggerConfig};
