//! Error types for SimuFed.

use crate::core::types::ClientId;
use thiserror::Error;

/// Result type alias for SimuFed operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading data, configuring or aggregating a round.
#[derive(Error, Debug)]
pub enum Error {
    // Data errors (scoped to a single client)
    #[error("Data source unavailable: {0}")]
    DataSourceUnavailable(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid value at row {row}: {value:?}")]
    InvalidValue { row: usize, value: String },

    #[error("Non-finite value in data, cannot derive histogram range")]
    NonFiniteData,

    // Configuration errors (surfaced to the caller of a round)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Histogram length mismatch: expected {expected} bins, got {actual}")]
    HistogramLengthMismatch { expected: usize, actual: usize },

    #[error("Histogram edges of client {0} do not match the round layout")]
    HistogramEdgeMismatch(ClientId),

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a round-level configuration error.
    ///
    /// Everything else is local to one client and resolves to a non-arrival.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_)
                | Error::HistogramLengthMismatch { .. }
                | Error::HistogramEdgeMismatch(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(Error::InvalidConfig("bins".into()).is_configuration());
        assert!(Error::HistogramLengthMismatch { expected: 3, actual: 4 }.is_configuration());
        assert!(Error::HistogramEdgeMismatch(2).is_configuration());
        assert!(!Error::DataSourceUnavailable("x.csv".into()).is_configuration());
        assert!(!Error::NonFiniteData.is_configuration());
    }

    #[test]
    fn test_error_display() {
        let err = Error::InvalidValue {
            row: 4,
            value: "abc".into(),
        };
        assert_eq!(err.to_string(), "Invalid value at row 4: \"abc\"");
    }

    #[test]
    fn test_from_serde_json() {
        let err: Error = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, Error::SerializationError(_)));
    }
}
