//! Tri-state selection over the cached hierarchy.
//!
//! The selection engine owns the per-node check state and keeps it
//! consistent with the cascading semantics of a tree picker:
//!
//! - toggling a leaf flips it and re-derives every ancestor bottom-up;
//! - toggling a loaded internal node applies the new state to its whole
//!   loaded subtree;
//! - toggling a collapsed internal node whose children were never fetched
//!   applies the state optimistically and flags it *pending*, so the state
//!   is propagated to the children when they eventually load — the user
//!   never waits on a network round trip to check a chapter;
//! - a saved code that no longer exists in the live hierarchy is kept as a
//!   *placeholder* entry carrying its saved label, replaced by the live
//!   node if one ever loads.

use std::collections::HashMap;
use std::collections::HashSet;

use cohort_terms::{CheckState, NodeKey, SelectedCode, SystemId};
use tracing::warn;

use crate::store::NodeStore;
use crate::walker::HierarchyWalker;

/// Selection record of one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionEntry {
    /// Current check state.
    pub state: CheckState,
    /// Whether the state still has to be propagated to children that were
    /// not yet fetched when it was set.
    pub pending: bool,
    /// Saved label of a placeholder entry; `None` once a live node backs
    /// the entry.
    pub saved_label: Option<String>,
}

impl SelectionEntry {
    /// Whether the entry has no backing node in the store.
    pub fn is_placeholder(&self) -> bool {
        self.saved_label.is_some()
    }
}

/// Per-node check states with cascading consistency.
///
/// State entries are created on first toggle or on reconciliation and live
/// until the owning session clears them. Internal-node states are derived
/// from children; leaf states (and states set on nodes whose children are
/// not loaded yet) are authoritative.
#[derive(Debug, Default)]
pub struct SelectionEngine {
    entries: HashMap<NodeKey, SelectionEntry>,
    placeholder_order: Vec<NodeKey>,
}

impl SelectionEngine {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// The check state of a node; `Unchecked` when never touched.
    pub fn state_of(&self, key: &NodeKey) -> CheckState {
        self.entries.get(key).map(|e| e.state).unwrap_or_default()
    }

    /// The full entry of a node, if any state was ever recorded.
    pub fn entry(&self, key: &NodeKey) -> Option<&SelectionEntry> {
        self.entries.get(key)
    }

    /// Whether a node carries an unpropagated optimistic state.
    pub fn is_pending(&self, key: &NodeKey) -> bool {
        self.entries.get(key).is_some_and(|e| e.pending)
    }

    /// Flips a node's state and restores consistency.
    ///
    /// `Checked` toggles to `Unchecked`; `Unchecked` and `Indeterminate`
    /// toggle to `Checked`. Toggling an id unknown to the store is a no-op
    /// with a warning.
    pub fn toggle(&mut self, store: &NodeStore, system: SystemId, id: &str) {
        let key = NodeKey::new(system, id);
        if store.node_by_key(&key).is_none() {
            warn!(node = %key, "toggle on a node absent from the store");
            return;
        }
        let target = self.state_of(&key).toggled();
        self.set_state(store, &key, target);
    }

    /// Applies a state to a node with full cascading semantics.
    ///
    /// This is the primitive shared by [`toggle`](Self::toggle) and by
    /// reconciliation (a saved chapter code must re-check its whole loaded
    /// subtree). Ancestors are re-derived afterwards.
    pub fn set_state(&mut self, store: &NodeStore, key: &NodeKey, target: CheckState) {
        let Some(node) = store.node_by_key(key) else {
            warn!(node = %key, "set_state on a node absent from the store");
            return;
        };

        if node.is_leaf {
            self.put_state(key.clone(), target, false);
        } else {
            self.apply_subtree(store, key, target);
        }
        self.recompute_ancestors(store, key);
    }

    /// Applies `target` to a node and every loaded descendant, flagging
    /// nodes whose children are unfetched as pending.
    fn apply_subtree(&mut self, store: &NodeStore, root: &NodeKey, target: CheckState) {
        let mut stack = vec![root.clone()];
        while let Some(key) = stack.pop() {
            let Some(node) = store.node_by_key(&key) else {
                continue;
            };
            let pending = !node.is_leaf && !node.children_loaded();
            self.put_state(key.clone(), target, pending);

            if let Some(child_ids) = node.child_ids.as_ref() {
                for child in child_ids {
                    stack.push(NodeKey::new(key.system, child.clone()));
                }
            }
        }
    }

    /// Re-derives ancestor states from `key`'s parent up to the root.
    ///
    /// Visit order is always child-to-root; the walk stops early at the
    /// first ancestor whose derived state did not change.
    pub fn recompute_ancestors(&mut self, store: &NodeStore, key: &NodeKey) {
        let mut current = parent_key(store, key);
        while let Some(node_key) = current {
            if !self.recompute_node(store, &node_key) {
                break;
            }
            current = parent_key(store, &node_key);
        }
    }

    /// Re-derives one node's state from its children. Returns whether the
    /// state changed. Nodes without loaded children keep their
    /// authoritative state.
    fn recompute_node(&mut self, store: &NodeStore, key: &NodeKey) -> bool {
        let Some(node) = store.node_by_key(key) else {
            return false;
        };
        let Some(child_ids) = node.child_ids.as_ref() else {
            return false;
        };
        let Some(derived) = CheckState::combine(
            child_ids
                .iter()
                .map(|child| self.state_of(&NodeKey::new(key.system, child.clone()))),
        ) else {
            return false;
        };

        if self.state_of(key) == derived {
            return false;
        }
        self.put_state(key.clone(), derived, false);
        true
    }

    /// Integrates a freshly loaded level into the selection.
    ///
    /// Runs before the expand call resolves, in three steps:
    /// 1. placeholder entries among the children are now backed by live
    ///    nodes — their saved labels are dropped, and a checked placeholder
    ///    that turned out internal is flagged pending so the check reaches
    ///    its own children later;
    /// 2. a pending state on the parent is propagated to every child
    ///    (overriding placeholder-restored states) and the flag cleared;
    /// 3. the parent and its ancestors are re-derived.
    pub fn on_children_loaded(
        &mut self,
        store: &NodeStore,
        parent: Option<&NodeKey>,
        children: &[NodeKey],
    ) {
        for child in children {
            let resolved = self
                .entries
                .get_mut(child)
                .filter(|e| e.saved_label.is_some())
                .map(|e| {
                    e.saved_label = None;
                    e.state
                });
            if let Some(state) = resolved {
                self.placeholder_order.retain(|k| k != child);
                let unloaded_internal = store
                    .node_by_key(child)
                    .is_some_and(|n| !n.is_leaf && !n.children_loaded());
                if unloaded_internal {
                    if let Some(e) = self.entries.get_mut(child) {
                        e.pending = true;
                        e.state = state;
                    }
                }
            }
        }

        let Some(parent) = parent else {
            return;
        };

        let pending_state = self
            .entries
            .get(parent)
            .filter(|e| e.pending)
            .map(|e| e.state);
        if let Some(state) = pending_state {
            for child in children {
                let pending = store
                    .node_by_key(child)
                    .is_some_and(|n| !n.is_leaf && !n.children_loaded());
                self.put_state(child.clone(), state, pending);
            }
            if let Some(entry) = self.entries.get_mut(parent) {
                entry.pending = false;
            }
        }

        self.recompute_node(store, parent);
        self.recompute_ancestors(store, parent);
    }

    /// Registers a saved code with no backing node as a checked
    /// placeholder carrying its saved label.
    pub fn add_placeholder(&mut self, key: NodeKey, label: impl Into<String>) {
        let entry = self.entries.entry(key.clone()).or_default();
        entry.state = CheckState::Checked;
        if entry.saved_label.is_none() {
            self.placeholder_order.push(key);
        }
        entry.saved_label = Some(label.into());
    }

    /// The node ids kept visible by a free-text tree filter; see
    /// [`HierarchyWalker::visible_matches`].
    pub fn search(&self, store: &NodeStore, system: SystemId, query: &str) -> HashSet<NodeKey> {
        HierarchyWalker::new(store).visible_matches(system, query)
    }

    /// The current flat selection, as handed to chip rendering and to the
    /// query-criteria serializer.
    ///
    /// Live nodes contribute their top-most checked cover in depth-first
    /// tree order (a fully-checked chapter is exported as the chapter code,
    /// not as its leaves); unresolved placeholders follow in the order they
    /// were reconciled, carrying their saved labels.
    pub fn selection(&self, store: &NodeStore) -> Vec<SelectedCode> {
        let mut out = Vec::new();

        for system in SystemId::ALL {
            let Some(root_ids) = store.root_ids(system) else {
                continue;
            };
            let mut stack: Vec<String> = root_ids.iter().rev().cloned().collect();
            while let Some(id) = stack.pop() {
                let key = NodeKey::new(system, id);
                let Some(node) = store.node_by_key(&key) else {
                    continue;
                };
                if self.state_of(&key).is_checked() {
                    out.push(SelectedCode::new(node.id.clone(), node.label.clone(), system));
                    continue;
                }
                if let Some(child_ids) = node.child_ids.as_ref() {
                    for child in child_ids.iter().rev() {
                        stack.push(child.clone());
                    }
                }
            }
        }

        for key in &self.placeholder_order {
            if let Some(entry) = self.entries.get(key) {
                if let Some(label) = entry.saved_label.as_ref() {
                    if entry.state.is_checked() {
                        out.push(SelectedCode::new(key.id.clone(), label.clone(), key.system));
                    }
                }
            }
        }

        out
    }

    /// The checked leaves of the loaded tree, sorted for stable comparison.
    pub fn checked_leaves(&self, store: &NodeStore) -> Vec<NodeKey> {
        let mut leaves: Vec<NodeKey> = self
            .entries
            .iter()
            .filter(|(key, entry)| {
                entry.state.is_checked()
                    && store.node_by_key(key).is_some_and(|n| n.is_leaf)
            })
            .map(|(key, _)| key.clone())
            .collect();
        leaves.sort();
        leaves
    }

    /// Drops every state entry; called when the owning criterion is
    /// discarded.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.placeholder_order.clear();
    }

    /// Number of recorded state entries (including placeholders).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no state was ever recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn put_state(&mut self, key: NodeKey, state: CheckState, pending: bool) {
        let entry = self.entries.entry(key.clone()).or_default();
        entry.state = state;
        entry.pending = pending;
        if entry.saved_label.take().is_some() {
            self.placeholder_order.retain(|k| k != &key);
        }
    }
}

fn parent_key(store: &NodeStore, key: &NodeKey) -> Option<NodeKey> {
    store
        .node_by_key(key)
        .and_then(|n| n.parent_id.as_ref())
        .map(|id| NodeKey::new(key.system, id.clone()))
}
