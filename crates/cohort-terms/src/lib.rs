//! # cohort-terms
//!
//! Core types for hierarchical clinical terminology selection.
//!
//! This crate provides the foundational data model shared by the engine
//! crate (`cohort-terms-engine`): coding-system identifiers, hierarchy
//! nodes and wire DTOs, the tri-state selection algebra, and the text
//! normalization used for accent-insensitive code search.
//!
//! ## Coding systems
//!
//! A cohort-selection query mixes codes from several terminologies, each
//! with its own hierarchy:
//!
//! | System | Contents |
//! |--------|----------|
//! | `CIM10` | diagnoses (French ICD-10) |
//! | `CCAM` | medical procedures |
//! | `ATC` | drug classes |
//! | `UCD` | drug dispensing units |
//! | `GHM` | hospital stay groups |
//! | `SCOPE` | organizational care-site perimeters |
//!
//! Node identity is always the `(system, id)` pair — the same string id in
//! two systems refers to unrelated codes and is never conflated.
//!
//! ## Usage
//!
//! ```rust
//! use cohort_terms::{CheckState, NodeKey, SelectedCode, SystemId};
//!
//! let key = NodeKey::new(SystemId::Cim10, "E11");
//! assert_eq!(key.to_string(), "CIM10:E11");
//!
//! let code = SelectedCode::new("E11", "Type 2 diabetes mellitus", SystemId::Cim10);
//! assert_eq!(code.system, SystemId::Cim10);
//!
//! // Derived state of a parent from its children
//! let derived = CheckState::combine([CheckState::Checked, CheckState::Unchecked]);
//! assert_eq!(derived, Some(CheckState::Indeterminate));
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` - Serde derives on the data model (wire DTOs, saved selections)

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod node;
mod state;
mod system;
pub mod text;

pub use error::{TermsError, TermsResult};
pub use node::{HierarchyNode, LoadState, NodeDto, NodeKey, SelectedCode};
pub use state::CheckState;
pub use system::SystemId;
