//! Error types for the fraud engine

use thiserror::Error;

/// Fraud engine error
#[derive(Debug, Error)]
pub enum Error {
    /// Signal source could not produce a value
    #[error("Signal unavailable: {0}")]
    SignalUnavailable(String),

    /// Signal source did not answer in time
    #[error("Signal timed out after {0} ms")]
    SignalTimeout(u64),

    /// Circuit breaker rejected the call
    #[error("Circuit breaker {0} is open")]
    CircuitOpen(String),

    /// Rule lookup failed
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Transaction log storage failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type
pub type Result<T> = std::result::Result<T, Error>;
