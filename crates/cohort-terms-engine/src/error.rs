//! Error types for the selection engine.

use cohort_terms::{NodeKey, SystemId};
use thiserror::Error;

/// Failure reported by the fetch collaborator.
///
/// The engine never inspects the cause; it only needs a display message to
/// surface next to the node whose load failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct FetchError(pub String);

impl FetchError {
    /// Creates a fetch error from any displayable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors that can occur during engine operations.
///
/// All variants are `Clone`: a deduplicated in-flight load hands the same
/// outcome to every caller that shared it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The fetch collaborator failed during an expand or search.
    ///
    /// Retryable: the affected node is left `Failed` and a new expand call
    /// issues a fresh fetch.
    #[error("fetch failed for {system} {target}: {message}")]
    Fetch {
        /// System the fetch was issued for.
        system: SystemId,
        /// `"roots"`, a node id, or a search description.
        target: String,
        /// Collaborator-provided failure message.
        message: String,
    },

    /// An in-flight expand was cancelled by a collapse or view teardown,
    /// or its response arrived after the node's epoch had advanced.
    #[error("fetch cancelled for {system} {target}")]
    Cancelled {
        /// System the fetch was issued for.
        system: SystemId,
        /// `"roots"` or the node id.
        target: String,
    },

    /// Expand referenced an id absent from the node store.
    #[error("unknown node: {0}")]
    UnknownNode(NodeKey),
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Display name of a fetch target: the parent id, or `"roots"`.
pub(crate) fn target_name(parent: Option<&str>) -> String {
    parent.map_or_else(|| "roots".to_string(), str::to_string)
}
