//! Error types for the core terminology model.

use thiserror::Error;

/// Errors raised by the core type layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TermsError {
    /// A coding-system name that is not one of the known systems.
    #[error("unknown coding system: {0}")]
    UnknownSystem(String),
}

/// Result type for core type operations.
pub type TermsResult<T> = std::result::Result<T, TermsError>;
