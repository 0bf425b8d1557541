//! # cohort-terms-engine
//!
//! Hierarchy selection engine for cohort-building over coded clinical
//! terminologies.
//!
//! Clinicians build cohort queries by picking codes from large
//! hierarchical terminologies (CIM10 diagnoses, CCAM procedures, ATC/UCD
//! drugs, GHM stay groups) and organizational scope trees. This crate is
//! the engine behind those pickers: a lazily-loaded multi-root forest
//! with tri-state selection, saved-selection reconciliation and
//! per-system grouping, independent of any UI framework.
//!
//! ## Key guarantees
//!
//! - **Cascading consistency** - every loaded internal node's state is
//!   derived bottom-up from its children on every mutation
//! - **Optimistic chapter checks** - a collapsed chapter can be checked
//!   before its children were ever fetched; the state propagates when
//!   they load
//! - **At-most-once fetching** - concurrent expands of one node share a
//!   single in-flight fetch; cancelled fetches never write the store
//! - **Durable saved criteria** - saved codes missing from the live
//!   hierarchy survive as placeholders with their saved labels
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use cohort_terms::SystemId;
//! use cohort_terms_engine::SelectionSession;
//!
//! // One session per open criterion editor
//! let session = SelectionSession::new(Arc::new(my_fetcher));
//!
//! // Lazily load and navigate the tree
//! let roots = session.load_roots(SystemId::Cim10).await?;
//! session.expand(SystemId::Cim10, "E10-E14").await?;
//!
//! // Tri-state selection with cascading
//! session.toggle(SystemId::Cim10, "E11");
//!
//! // Rehydrate a previously saved criterion
//! session.reconcile(SystemId::Cim10, &saved_codes);
//!
//! // Chips / export, grouped by system
//! for group in session.grouped_selection() {
//!     println!("{}: {} codes", group.system, group.codes.len());
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     cohort-terms-engine                      │
//! │                                                              │
//! │  SelectionSession (one per open criterion)                   │
//! │  ├── NodeStore        - arena of fetched nodes per system    │
//! │  ├── LazyLoader       - dedup'd, abortable child fetches     │
//! │  │     └── TermFetcher (trait) - the transport collaborator  │
//! │  ├── SelectionEngine  - tri-state map + cascade rules        │
//! │  │     └── HierarchyWalker - ancestors/descendants/search    │
//! │  ├── reconcile()      - saved codes → live state/placeholder │
//! │  └── group_by_system()- flat selection → per-system groups   │
//! │                                                              │
//! │  Dependencies:                                               │
//! │  └── cohort-terms - SystemId, nodes, DTOs, tri-state algebra │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` - Serde derives on the data model (via `cohort-terms/serde`)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod cache;
mod config;
mod error;
mod grouper;
mod loader;
mod reconcile;
mod selection;
mod session;
mod store;
mod traits;
mod walker;

// Public re-exports
pub use cache::{SearchCache, SearchCacheStats};
pub use config::{SearchCacheConfig, SessionConfig, SessionConfigBuilder};
pub use error::{EngineError, EngineResult, FetchError};
pub use grouper::{group_by_system, SystemGroup};
pub use loader::{LazyLoader, LoaderStats};
pub use reconcile::{reconcile, ReconcileReport};
pub use selection::{SelectionEngine, SelectionEntry};
pub use session::SelectionSession;
pub use store::NodeStore;
pub use traits::TermFetcher;
pub use walker::HierarchyWalker;

// Re-export commonly used types from the types crate for convenience
pub use cohort_terms::{
    CheckState, HierarchyNode, LoadState, NodeDto, NodeKey, SelectedCode, SystemId,
};
