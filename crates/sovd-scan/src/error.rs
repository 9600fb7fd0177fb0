//! Enumeration engine errors

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced to the caller of the enumeration engine
#[derive(Debug, Error)]
pub enum ScanError {
    /// Transport failure during an exchange. Transient failures have already
    /// scheduled a retry for the next `execute` call when this is returned.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Invalid options or configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No triggering request is known for the edge
    #[error("Unknown edge: {0}")]
    UnknownEdge(String),

    /// Snapshot could not be written or read
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

/// Configuration errors, reported immediately and never retried
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Unknown keys, wrong value types or syntax errors
    #[error("Failed to parse options: {0}")]
    Parse(String),

    /// Values that parse but make no sense
    #[error("Invalid option {option}: {message}")]
    Invalid { option: String, message: String },
}
