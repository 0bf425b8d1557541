//! One criterion-editing session.

use std::collections::HashSet;
use std::sync::Arc;

use cohort_terms::{CheckState, HierarchyNode, NodeDto, NodeKey, SelectedCode, SystemId};
use parking_lot::RwLock;

use crate::config::SessionConfig;
use crate::error::EngineResult;
use crate::grouper::{group_by_system, SystemGroup};
use crate::loader::{LazyLoader, LoaderStats};
use crate::reconcile::{reconcile, ReconcileReport};
use crate::selection::SelectionEngine;
use crate::store::NodeStore;
use crate::traits::TermFetcher;
use crate::walker::HierarchyWalker;

/// The selection engine of one open criterion.
///
/// A session owns every cache involved in editing one criterion: the node
/// store, the selection state, the in-flight fetch bookkeeping and the
/// search cache. Sessions are created when a criterion editor opens and
/// dropped when it closes; nothing is shared between two criteria or two
/// users, so discarding a session can never leak selection state into an
/// unrelated one.
///
/// All synchronous operations (`toggle`, `reconcile`, `selection`, ...)
/// run to completion without interleaving; only `load_roots`, `expand`
/// and `search` suspend.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use cohort_terms::SystemId;
/// use cohort_terms_engine::SelectionSession;
///
/// let session = SelectionSession::new(Arc::new(my_fetcher));
///
/// let roots = session.load_roots(SystemId::Cim10).await?;
/// session.expand(SystemId::Cim10, &roots[0].id).await?;
/// session.toggle(SystemId::Cim10, "E11");
///
/// for group in session.grouped_selection() {
///     println!("{}: {} codes", group.system, group.codes.len());
/// }
/// ```
pub struct SelectionSession {
    store: Arc<RwLock<NodeStore>>,
    selection: Arc<RwLock<SelectionEngine>>,
    loader: LazyLoader,
    config: SessionConfig,
}

impl SelectionSession {
    /// Creates a session with the default configuration.
    pub fn new(fetcher: Arc<dyn TermFetcher>) -> Self {
        Self::with_config(fetcher, SessionConfig::default())
    }

    /// Creates a session with a custom configuration.
    pub fn with_config(fetcher: Arc<dyn TermFetcher>, config: SessionConfig) -> Self {
        let store = Arc::new(RwLock::new(NodeStore::new()));
        let selection = Arc::new(RwLock::new(SelectionEngine::new()));
        let loader = LazyLoader::new(fetcher, Arc::clone(&store), Arc::clone(&selection), &config);
        Self {
            store,
            selection,
            loader,
            config,
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Loads (or returns the cached) roots of a system.
    pub async fn load_roots(&self, system: SystemId) -> EngineResult<Vec<HierarchyNode>> {
        self.loader.load_roots(system).await
    }

    /// Loads (or returns the cached) children of a node.
    pub async fn expand(&self, system: SystemId, node_id: &str) -> EngineResult<Vec<HierarchyNode>> {
        self.loader.expand(system, node_id).await
    }

    /// Cancels an in-flight expand; called when the node collapses.
    pub fn cancel_expand(&self, system: SystemId, node_id: &str) {
        self.loader.cancel_expand(system, node_id);
    }

    /// Cancels an in-flight root load; called on view teardown.
    pub fn cancel_roots(&self, system: SystemId) {
        self.loader.cancel_roots(system);
    }

    /// Flat free-text code search; results never touch the tree.
    pub async fn search(&self, system: SystemId, query: &str) -> EngineResult<Vec<NodeDto>> {
        self.loader.search(system, query).await
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Toggles a node's check state with full cascading semantics.
    pub fn toggle(&self, system: SystemId, node_id: &str) {
        let store = self.store.read();
        self.selection.write().toggle(&store, system, node_id);
    }

    /// The check state of a node, `Unchecked` when never touched.
    pub fn state_of(&self, system: SystemId, node_id: &str) -> CheckState {
        self.selection
            .read()
            .state_of(&NodeKey::new(system, node_id))
    }

    /// Merges a previously saved selection into the session; codes missing
    /// from the live hierarchy degrade to placeholders. Run once per
    /// system when its selector activates.
    pub fn reconcile(&self, system: SystemId, saved: &[SelectedCode]) -> ReconcileReport {
        let store = self.store.read();
        reconcile(&mut self.selection.write(), &store, system, saved)
    }

    /// The current flat selection: top-most checked cover plus
    /// placeholders.
    pub fn selection(&self) -> Vec<SelectedCode> {
        // Lock order is store before selection, everywhere.
        let store = self.store.read();
        self.selection.read().selection(&store)
    }

    /// The current selection grouped by system, for chips and export.
    pub fn grouped_selection(&self) -> Vec<SystemGroup> {
        group_by_system(&self.selection())
    }

    /// The checked leaves of the loaded tree, sorted.
    pub fn checked_leaves(&self) -> Vec<NodeKey> {
        let store = self.store.read();
        self.selection.read().checked_leaves(&store)
    }

    /// Drops the whole selection state; the node cache is kept.
    pub fn clear_selection(&self) {
        self.selection.write().clear();
    }

    // ------------------------------------------------------------------
    // Tree reads
    // ------------------------------------------------------------------

    /// A snapshot of one node.
    pub fn node(&self, system: SystemId, node_id: &str) -> Option<HierarchyNode> {
        self.store.read().node(system, node_id).cloned()
    }

    /// A snapshot of a system's roots, `None` until first load.
    pub fn roots(&self, system: SystemId) -> Option<Vec<HierarchyNode>> {
        self.store
            .read()
            .roots(system)
            .map(|roots| roots.into_iter().cloned().collect())
    }

    /// A snapshot of a node's children, `None` until they are fetched.
    pub fn children(&self, system: SystemId, node_id: &str) -> Option<Vec<HierarchyNode>> {
        self.store
            .read()
            .children_of(system, node_id)
            .map(|children| children.into_iter().cloned().collect())
    }

    /// The nodes kept visible by a free-text tree filter: matches plus all
    /// their ancestors.
    pub fn visible_matches(&self, system: SystemId, query: &str) -> HashSet<NodeKey> {
        let store = self.store.read();
        HierarchyWalker::new(&store).visible_matches(system, query)
    }

    /// Loader traffic counters.
    pub fn stats(&self) -> LoaderStats {
        self.loader.stats()
    }
}

impl std::fmt::Debug for SelectionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionSession")
            .field("nodes", &self.store.read().len())
            .field("selection_entries", &self.selection.read().len())
            .field("stats", &self.stats())
            .finish()
    }
}
