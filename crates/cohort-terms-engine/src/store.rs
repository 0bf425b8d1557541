//! In-memory arena of fetched hierarchy nodes.

use std::collections::HashMap;

use cohort_terms::{HierarchyNode, LoadState, NodeKey, SystemId};
use tracing::warn;

/// Session-scoped cache of hierarchy nodes, addressed by `(system, id)`.
///
/// The store is an append-only arena: nodes are created on the first
/// successful fetch response and never deleted for the lifetime of the
/// session. Re-fetching a level merges labels into existing nodes and
/// preserves any grandchildren that were already loaded, so a stale expand
/// can never un-load a subtree the user is looking at.
///
/// The store is independent of any UI lifecycle; unit tests drive it
/// directly without a rendering environment.
#[derive(Debug, Default)]
pub struct NodeStore {
    nodes: HashMap<NodeKey, HierarchyNode>,
    roots: HashMap<SystemId, Vec<String>>,
    root_states: HashMap<SystemId, LoadState>,
}

impl NodeStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a node by system and id.
    pub fn node(&self, system: SystemId, id: &str) -> Option<&HierarchyNode> {
        self.nodes.get(&NodeKey::new(system, id))
    }

    /// Looks up a node by key.
    pub fn node_by_key(&self, key: &NodeKey) -> Option<&HierarchyNode> {
        self.nodes.get(key)
    }

    /// Whether a node exists in the store.
    pub fn contains(&self, system: SystemId, id: &str) -> bool {
        self.nodes.contains_key(&NodeKey::new(system, id))
    }

    /// The ordered roots of a system, `None` until the first root load.
    pub fn roots(&self, system: SystemId) -> Option<Vec<&HierarchyNode>> {
        let ids = self.roots.get(&system)?;
        Some(
            ids.iter()
                .filter_map(|id| self.node(system, id))
                .collect(),
        )
    }

    /// The ordered root ids of a system, `None` until the first root load.
    pub fn root_ids(&self, system: SystemId) -> Option<&[String]> {
        self.roots.get(&system).map(Vec::as_slice)
    }

    /// Load lifecycle of the system's root list.
    pub fn root_state(&self, system: SystemId) -> LoadState {
        self.root_states.get(&system).copied().unwrap_or_default()
    }

    /// The ordered children of a node, `None` until they are fetched.
    pub fn children_of(&self, system: SystemId, id: &str) -> Option<Vec<&HierarchyNode>> {
        let node = self.node(system, id)?;
        let ids = node.child_ids.as_ref()?;
        Some(
            ids.iter()
                .filter_map(|child| self.node(system, child))
                .collect(),
        )
    }

    /// Load lifecycle of a fetch target: a node's children, or the system
    /// roots when `parent` is `None`.
    pub fn load_state(&self, system: SystemId, parent: Option<&str>) -> LoadState {
        match parent {
            Some(id) => self
                .node(system, id)
                .map(|n| n.load_state)
                .unwrap_or_default(),
            None => self.root_state(system),
        }
    }

    /// Merges a fetched level into the cache.
    ///
    /// `parent` is the node whose children were fetched, or `None` for a
    /// root fetch. Nodes already present keep their loaded children and
    /// load state (only the label and parent link are refreshed); new nodes
    /// are inserted as supplied. The parent (or the system root slot) is
    /// marked `Loaded` with the fetched child order.
    ///
    /// A `parent` unknown to the store is a stale response from an earlier
    /// session state: the merge is skipped with a warning.
    ///
    /// Returns the keys of the merged level in fetch order.
    pub fn put_children(
        &mut self,
        system: SystemId,
        parent: Option<&str>,
        nodes: Vec<HierarchyNode>,
    ) -> Vec<NodeKey> {
        if let Some(parent_id) = parent {
            if !self.contains(system, parent_id) {
                warn!(
                    system = %system,
                    parent = parent_id,
                    "dropping children for unknown parent"
                );
                return Vec::new();
            }
        }

        let mut level_ids = Vec::with_capacity(nodes.len());
        let mut keys = Vec::with_capacity(nodes.len());

        for mut node in nodes {
            let key = NodeKey::new(system, node.id.clone());
            node.parent_id = parent.map(str::to_string);
            level_ids.push(node.id.clone());

            match self.nodes.get_mut(&key) {
                Some(existing) => {
                    existing.label = node.label;
                    existing.parent_id = node.parent_id;
                    if existing.child_ids.is_none() {
                        existing.is_leaf = node.is_leaf;
                        existing.load_state = node.load_state;
                        existing.child_ids = node.child_ids;
                    }
                }
                None => {
                    self.nodes.insert(key.clone(), node);
                }
            }
            keys.push(key);
        }

        match parent {
            Some(parent_id) => {
                if let Some(parent_node) = self.nodes.get_mut(&NodeKey::new(system, parent_id)) {
                    parent_node.child_ids = Some(level_ids);
                    parent_node.load_state = LoadState::Loaded;
                }
            }
            None => {
                self.roots.insert(system, level_ids);
                self.root_states.insert(system, LoadState::Loaded);
            }
        }

        keys
    }

    /// Marks a fetch target `Loading`.
    pub fn mark_loading(&mut self, system: SystemId, parent: Option<&str>) {
        self.set_target_state(system, parent, LoadState::Loading);
    }

    /// Marks a fetch target `Failed`, leaving siblings and ancestors intact.
    pub fn mark_failed(&mut self, system: SystemId, parent: Option<&str>) {
        self.set_target_state(system, parent, LoadState::Failed);
    }

    /// Rolls a cancelled fetch target back to `NotLoaded`.
    ///
    /// Only applies while the target is `Loading`: a target that completed
    /// before the cancellation keeps its result.
    pub fn reset_not_loaded(&mut self, system: SystemId, parent: Option<&str>) {
        if self.load_state(system, parent) == LoadState::Loading {
            self.set_target_state(system, parent, LoadState::NotLoaded);
        }
    }

    fn set_target_state(&mut self, system: SystemId, parent: Option<&str>, state: LoadState) {
        match parent {
            Some(id) => {
                if let Some(node) = self.nodes.get_mut(&NodeKey::new(system, id)) {
                    node.load_state = state;
                }
            }
            None => {
                self.root_states.insert(system, state);
            }
        }
    }

    /// Iterates all cached nodes of a system, in no particular order.
    pub fn system_nodes(&self, system: SystemId) -> impl Iterator<Item = &HierarchyNode> {
        self.nodes.values().filter(move |n| n.system == system)
    }

    /// Number of cached nodes across all systems.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the store holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
