//! The fetch collaborator trait.
//!
//! The engine is transport-agnostic: everything it knows about the outside
//! world goes through [`TermFetcher`], implemented by the consuming
//! application over its terminology backend (FHIR, REST, a local bundle in
//! tests). The engine normalizes whatever comes back — per-system payload
//! shapes are flattened into [`NodeDto`] before this trait is involved,
//! and malformed DTOs are dropped at the loader boundary, so implementors
//! only relay data.
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//! use cohort_terms::{NodeDto, SystemId};
//! use cohort_terms_engine::{FetchError, TermFetcher};
//!
//! struct FhirFetcher { /* http client, base url */ }
//!
//! #[async_trait]
//! impl TermFetcher for FhirFetcher {
//!     async fn fetch_children(
//!         &self,
//!         system: SystemId,
//!         parent: Option<&str>,
//!     ) -> Result<Vec<NodeDto>, FetchError> {
//!         // GET /ValueSet/{system}?parent={parent}
//!         todo!()
//!     }
//!
//!     async fn fetch_search(
//!         &self,
//!         system: SystemId,
//!         query: &str,
//!     ) -> Result<Vec<NodeDto>, FetchError> {
//!         // GET /ValueSet/{system}/search?q={query}
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;
use cohort_terms::{NodeDto, SystemId};

use crate::error::FetchError;

/// Asynchronous source of terminology nodes.
///
/// Implementations should be cheap to call concurrently: the engine
/// already collapses duplicate expand calls for the same node into a
/// single `fetch_children` invocation, and cancels abandoned fetches by
/// dropping their futures — an implementation that stops work when its
/// future is dropped gets cancellation for free.
#[async_trait]
pub trait TermFetcher: Send + Sync {
    /// Fetches the direct children of `parent`, or the roots of the system
    /// when `parent` is `None`.
    async fn fetch_children(
        &self,
        system: SystemId,
        parent: Option<&str>,
    ) -> Result<Vec<NodeDto>, FetchError>;

    /// Flat, non-hierarchical lookup for free-text code search.
    ///
    /// Results are standalone hits; they are never merged into the cached
    /// tree and do not affect any node's load state.
    async fn fetch_search(
        &self,
        system: SystemId,
        query: &str,
    ) -> Result<Vec<NodeDto>, FetchError>;
}
