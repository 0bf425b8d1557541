//! Hierarchy nodes, wire DTOs and selection output codes.

use std::fmt;

use crate::system::SystemId;

/// Global identity of a hierarchy node: the `(system, id)` pair.
///
/// The same string id may exist in two systems with unrelated meaning
/// (e.g. a CCAM procedure and an ATC class); keys keep them apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeKey {
    /// The coding system the node belongs to.
    pub system: SystemId,
    /// The code identifier within the system.
    pub id: String,
}

impl NodeKey {
    /// Creates a key from a system and a code id.
    pub fn new(system: SystemId, id: impl Into<String>) -> Self {
        Self {
            system,
            id: id.into(),
        }
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.system, self.id)
    }
}

/// Load lifecycle of a node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadState {
    /// Children have never been fetched.
    #[default]
    NotLoaded,
    /// A fetch for the children is in flight.
    Loading,
    /// Children are cached.
    Loaded,
    /// The last fetch failed; calling expand again retries.
    Failed,
}

/// One entry of a hierarchical terminology or organizational tree.
///
/// Nodes are owned exclusively by the node store; they are created on the
/// first successful fetch response and never deleted during a session.
/// `child_ids == None` means the children have never been fetched, which is
/// distinct from a loaded empty child list.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HierarchyNode {
    /// Code identifier within `system`.
    pub id: String,
    /// Human-readable label.
    pub label: String,
    /// Owning coding system.
    pub system: SystemId,
    /// Parent code id, `None` for roots.
    pub parent_id: Option<String>,
    /// Ordered child ids, `None` until the children are fetched.
    pub child_ids: Option<Vec<String>>,
    /// Whether the node can have no children at all.
    pub is_leaf: bool,
    /// Child-fetch lifecycle state.
    pub load_state: LoadState,
}

impl HierarchyNode {
    /// The node's global identity.
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.system, self.id.clone())
    }

    /// Whether the direct children of this node are cached.
    ///
    /// Leaves are trivially loaded; internal nodes are loaded once a fetch
    /// has populated `child_ids`.
    pub fn children_loaded(&self) -> bool {
        self.is_leaf || (self.load_state == LoadState::Loaded && self.child_ids.is_some())
    }
}

/// Wire shape of a node as produced by the fetch collaborator.
///
/// The per-system payload differences are normalized into this single
/// tagged shape at the loader boundary; a DTO with an empty id is malformed
/// and is dropped with a warning rather than aborting its batch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeDto {
    /// Code identifier within `system`.
    pub id: String,
    /// Human-readable label.
    pub label: String,
    /// Owning coding system.
    pub system: SystemId,
    /// Parent code id, `None` for roots.
    pub parent_id: Option<String>,
    /// Whether the node has children to fetch.
    pub has_children: bool,
}

impl NodeDto {
    /// Creates a DTO; convenience for fetch implementations and tests.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        system: SystemId,
        parent_id: Option<&str>,
        has_children: bool,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            system,
            parent_id: parent_id.map(str::to_string),
            has_children,
        }
    }
}

/// One selected code, the serialization-agnostic output unit.
///
/// A selected code may reference a code that is absent from the live
/// hierarchy (renamed or deprecated since the selection was saved); it is
/// then preserved verbatim with its saved label.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SelectedCode {
    /// Code identifier within `system`.
    pub id: String,
    /// Label as displayed or as saved.
    pub label: String,
    /// Owning coding system.
    pub system: SystemId,
}

impl SelectedCode {
    /// Creates a selected code.
    pub fn new(id: impl Into<String>, label: impl Into<String>, system: SystemId) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            system,
        }
    }

    /// The code's global identity.
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.system, self.id.clone())
    }
}
