//! Error types for the declarative host

use crate::types::Diagnostics;

/// Result type for declarative operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by planning and execution
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Target address is malformed
    #[error("invalid target '{0}': expected TYPE or TYPE.NAME")]
    InvalidTarget(String),

    /// Target address matches nothing in configuration or state
    #[error("target '{0}' matches no resource")]
    UnknownTarget(String),

    /// Configuration failed validation
    #[error("invalid configuration:\n{0}")]
    Invalid(Diagnostics),

    /// Worker pool could not be created
    #[error("failed to create thread pool: {0}")]
    ThreadPool(String),
}
