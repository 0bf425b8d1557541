//! Rehydration of a saved flat selection against the live hierarchy.
//!
//! A previously saved criterion is a flat list of `{id, label, system}`
//! codes. When its editing session opens, the saved codes are merged into
//! the selection engine: codes still present in the fetched tree are
//! re-checked (with the full cascade for chapter codes), and codes absent
//! from it — renamed, deprecated, or simply not expanded yet — become
//! placeholder entries that keep the criterion editable and visually
//! correct across terminology updates.

use cohort_terms::{CheckState, SelectedCode, SystemId};
use tracing::warn;

use crate::selection::SelectionEngine;
use crate::store::NodeStore;

/// Outcome counts of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Codes found in the store and re-checked.
    pub applied: usize,
    /// Codes kept as placeholders.
    pub placeholders: usize,
    /// Codes skipped because they were tagged with another system.
    pub skipped: usize,
}

/// Merges a saved selection for one system into the engine state.
///
/// Each saved code is processed independently; a code that cannot be
/// resolved degrades to a placeholder instead of failing the batch. Codes
/// resolving to internal nodes re-check their whole loaded subtree, the
/// same cascade a user toggle runs.
pub fn reconcile(
    engine: &mut SelectionEngine,
    store: &NodeStore,
    system: SystemId,
    saved: &[SelectedCode],
) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for code in saved {
        if code.system != system {
            warn!(
                expected = %system,
                got = %code.system,
                id = %code.id,
                "saved code tagged with another system, skipping"
            );
            report.skipped += 1;
            continue;
        }

        let key = code.key();
        if store.node_by_key(&key).is_some() {
            engine.set_state(store, &key, CheckState::Checked);
            report.applied += 1;
        } else {
            engine.add_placeholder(key, code.label.clone());
            report.placeholders += 1;
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohort_terms::{HierarchyNode, LoadState, NodeKey};

    fn leaf(id: &str, label: &str) -> HierarchyNode {
        HierarchyNode {
            id: id.to_string(),
            label: label.to_string(),
            system: SystemId::Cim10,
            parent_id: None,
            child_ids: Some(Vec::new()),
            is_leaf: true,
            load_state: LoadState::Loaded,
        }
    }

    fn branch(id: &str, label: &str) -> HierarchyNode {
        HierarchyNode {
            id: id.to_string(),
            label: label.to_string(),
            system: SystemId::Cim10,
            parent_id: None,
            child_ids: None,
            is_leaf: false,
            load_state: LoadState::NotLoaded,
        }
    }

    fn key(id: &str) -> NodeKey {
        NodeKey::new(SystemId::Cim10, id)
    }

    fn saved(id: &str, label: &str) -> SelectedCode {
        SelectedCode::new(id, label, SystemId::Cim10)
    }

    fn loaded_tree() -> NodeStore {
        let mut store = NodeStore::new();
        store.put_children(SystemId::Cim10, None, vec![branch("A", "Chapter A")]);
        store.put_children(
            SystemId::Cim10,
            Some("A"),
            vec![leaf("B", "Code B"), leaf("C", "Code C")],
        );
        store
    }

    #[test]
    fn test_reconcile_leaf_rechecks_and_derives_ancestors() {
        let store = loaded_tree();
        let mut engine = SelectionEngine::new();

        let report = reconcile(&mut engine, &store, SystemId::Cim10, &[saved("B", "Code B")]);

        assert_eq!(report.applied, 1);
        assert_eq!(report.placeholders, 0);
        assert_eq!(engine.state_of(&key("B")), CheckState::Checked);
        assert_eq!(engine.state_of(&key("A")), CheckState::Indeterminate);
    }

    #[test]
    fn test_reconcile_chapter_rechecks_loaded_subtree() {
        let store = loaded_tree();
        let mut engine = SelectionEngine::new();

        let report = reconcile(
            &mut engine,
            &store,
            SystemId::Cim10,
            &[saved("A", "Chapter A")],
        );

        assert_eq!(report.applied, 1);
        assert_eq!(engine.state_of(&key("A")), CheckState::Checked);
        assert_eq!(engine.state_of(&key("B")), CheckState::Checked);
        assert_eq!(engine.state_of(&key("C")), CheckState::Checked);
    }

    #[test]
    fn test_reconcile_missing_code_becomes_placeholder() {
        let store = loaded_tree();
        let mut engine = SelectionEngine::new();

        let report = reconcile(
            &mut engine,
            &store,
            SystemId::Cim10,
            &[saved("X42", "Old code")],
        );

        assert_eq!(report.applied, 0);
        assert_eq!(report.placeholders, 1);
        let entry = engine.entry(&key("X42")).unwrap();
        assert!(entry.is_placeholder());
        assert_eq!(entry.state, CheckState::Checked);
        assert_eq!(entry.saved_label.as_deref(), Some("Old code"));
    }

    #[test]
    fn test_reconcile_failures_are_isolated_per_code() {
        let store = loaded_tree();
        let mut engine = SelectionEngine::new();

        let report = reconcile(
            &mut engine,
            &store,
            SystemId::Cim10,
            &[
                saved("B", "Code B"),
                saved("GONE", "Removed code"),
                saved("C", "Code C"),
            ],
        );

        assert_eq!(report.applied, 2);
        assert_eq!(report.placeholders, 1);
        // The live part is fully applied despite the missing code.
        assert_eq!(engine.state_of(&key("A")), CheckState::Checked);
    }

    #[test]
    fn test_reconcile_skips_codes_from_other_systems() {
        let store = loaded_tree();
        let mut engine = SelectionEngine::new();

        let report = reconcile(
            &mut engine,
            &store,
            SystemId::Cim10,
            &[SelectedCode::new("A10", "Insulins", SystemId::Atc)],
        );

        assert_eq!(report.skipped, 1);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let store = loaded_tree();
        let mut engine = SelectionEngine::new();
        let codes = [saved("B", "Code B"), saved("X42", "Old code")];

        reconcile(&mut engine, &store, SystemId::Cim10, &codes);
        let first = engine.selection(&store);
        reconcile(&mut engine, &store, SystemId::Cim10, &codes);
        let second = engine.selection(&store);

        assert_eq!(first, second);
    }
}
