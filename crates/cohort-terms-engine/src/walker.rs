//! Hierarchy traversal over the node store.
//!
//! This module provides the `HierarchyWalker` struct for walking the cached
//! part of a terminology tree: ancestor chains, BFS over loaded
//! descendants, full-load checks, and the visibility filter behind tree
//! search.

use std::collections::HashSet;
use std::collections::VecDeque;

use cohort_terms::text;
use cohort_terms::{NodeKey, SystemId};

use crate::store::NodeStore;

/// Walks the loaded portion of a terminology hierarchy.
///
/// All methods operate on what the store has cached; unfetched children are
/// simply not visited. The walker borrows the store and holds no state of
/// its own.
///
/// # Example
///
/// ```ignore
/// let walker = HierarchyWalker::new(&store);
/// let chain = walker.ancestors_of(&NodeKey::new(SystemId::Cim10, "E11"));
/// ```
pub struct HierarchyWalker<'a> {
    store: &'a NodeStore,
}

impl<'a> HierarchyWalker<'a> {
    /// Creates a walker over the given store.
    pub fn new(store: &'a NodeStore) -> Self {
        Self { store }
    }

    /// The ancestor chain of a node, in child-to-root order.
    ///
    /// Does not include the node itself. A node absent from the store has
    /// no ancestors.
    pub fn ancestors_of(&self, key: &NodeKey) -> Vec<NodeKey> {
        let mut chain = Vec::new();
        let mut current = self
            .store
            .node_by_key(key)
            .and_then(|n| n.parent_id.clone());

        while let Some(id) = current {
            let parent_key = NodeKey::new(key.system, id);
            current = self
                .store
                .node_by_key(&parent_key)
                .and_then(|n| n.parent_id.clone());
            chain.push(parent_key);
        }

        chain
    }

    /// All loaded descendants of a node, via BFS. Does not include the node
    /// itself; children that were never fetched are not visited.
    pub fn descendants_of(&self, key: &NodeKey) -> Vec<NodeKey> {
        let mut result = Vec::new();
        let mut queue = VecDeque::new();
        queue.push_back(key.clone());

        while let Some(current) = queue.pop_front() {
            let Some(node) = self.store.node_by_key(&current) else {
                continue;
            };
            let Some(child_ids) = node.child_ids.as_ref() else {
                continue;
            };
            for child in child_ids {
                let child_key = NodeKey::new(key.system, child.clone());
                result.push(child_key.clone());
                queue.push_back(child_key);
            }
        }

        result
    }

    /// Whether every descendant of a node (including the node itself) has
    /// its children cached.
    ///
    /// An internal node anywhere in the subtree with unfetched children
    /// makes the whole subtree partially loaded.
    pub fn is_fully_loaded(&self, key: &NodeKey) -> bool {
        let mut queue = VecDeque::new();
        queue.push_back(key.clone());

        while let Some(current) = queue.pop_front() {
            let Some(node) = self.store.node_by_key(&current) else {
                return false;
            };
            if node.is_leaf {
                continue;
            }
            let Some(child_ids) = node.child_ids.as_ref() else {
                return false;
            };
            if !node.children_loaded() {
                return false;
            }
            for child in child_ids {
                queue.push_back(NodeKey::new(key.system, child.clone()));
            }
        }

        true
    }

    /// The set of nodes to keep visible for a free-text tree filter.
    ///
    /// A node matches when its label or its code contains the query,
    /// case- and diacritic-insensitively. Every ancestor of a match is
    /// included too, so a match is always reachable by expanding from a
    /// visible root. Selection state is not consulted and not altered.
    pub fn visible_matches(&self, system: SystemId, query: &str) -> HashSet<NodeKey> {
        let normalized = text::normalize(query);
        let mut visible = HashSet::new();

        for node in self.store.system_nodes(system) {
            if text::contains_normalized(&node.label, &normalized)
                || text::contains_normalized(&node.id, &normalized)
            {
                let key = node.key();
                for ancestor in self.ancestors_of(&key) {
                    visible.insert(ancestor);
                }
                visible.insert(key);
            }
        }

        visible
    }
}
