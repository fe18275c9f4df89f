//! Error types for the printer library

use thiserror::Error;

/// Printer error types
///
/// Callers treat every variant as one opaque transport failure; the variants
/// only exist to make log lines useful.
#[derive(Debug, Error)]
pub enum PrintError {
    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error while writing or draining the socket
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout connecting or waiting for the printer to close
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
