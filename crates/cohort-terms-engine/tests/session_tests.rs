//! End-to-end session tests over a scripted fetch collaborator.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cohort_terms::{CheckState, LoadState, NodeDto, NodeKey, SelectedCode, SystemId};
use cohort_terms_engine::{EngineError, FetchError, SelectionSession, TermFetcher};

/// Scripted in-memory fetch collaborator.
///
/// Levels are keyed by `(system, parent)` with `None` meaning the roots.
/// `fail_next` makes exactly one upcoming fetch fail, to exercise the
/// retry path.
struct ScriptedFetcher {
    levels: HashMap<(SystemId, Option<String>), Vec<NodeDto>>,
    searches: HashMap<(SystemId, String), Vec<NodeDto>>,
    child_calls: AtomicUsize,
    search_calls: AtomicUsize,
    fail_next: AtomicBool,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self {
            levels: HashMap::new(),
            searches: HashMap::new(),
            child_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }

    fn level(mut self, system: SystemId, parent: Option<&str>, nodes: Vec<NodeDto>) -> Self {
        self.levels.insert((system, parent.map(String::from)), nodes);
        self
    }

    fn search_result(mut self, system: SystemId, query: &str, nodes: Vec<NodeDto>) -> Self {
        self.searches.insert((system, query.to_string()), nodes);
        self
    }

    fn child_calls(&self) -> usize {
        self.child_calls.load(Ordering::SeqCst)
    }

    fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TermFetcher for ScriptedFetcher {
    async fn fetch_children(
        &self,
        system: SystemId,
        parent: Option<&str>,
    ) -> Result<Vec<NodeDto>, FetchError> {
        self.child_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(FetchError::new("terminology server unavailable"));
        }
        Ok(self
            .levels
            .get(&(system, parent.map(String::from)))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_search(
        &self,
        system: SystemId,
        query: &str,
    ) -> Result<Vec<NodeDto>, FetchError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .searches
            .get(&(system, query.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

fn dto(id: &str, label: &str, system: SystemId, parent: Option<&str>, has_children: bool) -> NodeDto {
    NodeDto::new(id, label, system, parent, has_children)
}

/// The CIM10 fragment used across the tests:
/// ```text
///        A "Chapter A"
///       /             \
///      B "Code B"     C "Code C"     (both leaves)
/// ```
fn diabetes_fetcher() -> ScriptedFetcher {
    ScriptedFetcher::new()
        .level(
            SystemId::Cim10,
            None,
            vec![dto("A", "Chapter A", SystemId::Cim10, None, true)],
        )
        .level(
            SystemId::Cim10,
            Some("A"),
            vec![
                dto("B", "Code B", SystemId::Cim10, Some("A"), false),
                dto("C", "Code C", SystemId::Cim10, Some("A"), false),
            ],
        )
}

fn key(id: &str) -> NodeKey {
    NodeKey::new(SystemId::Cim10, id)
}

#[tokio::test]
async fn test_load_roots_then_expand() {
    let session = SelectionSession::new(Arc::new(diabetes_fetcher()));

    let roots = session.load_roots(SystemId::Cim10).await.unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].id, "A");
    assert_eq!(roots[0].load_state, LoadState::NotLoaded);

    let children = session.expand(SystemId::Cim10, "A").await.unwrap();
    assert_eq!(children.len(), 2);
    assert!(children.iter().all(|c| c.is_leaf));

    let parent = session.node(SystemId::Cim10, "A").unwrap();
    assert_eq!(parent.load_state, LoadState::Loaded);
}

#[tokio::test]
async fn test_expand_unknown_node_is_error() {
    let session = SelectionSession::new(Arc::new(diabetes_fetcher()));
    session.load_roots(SystemId::Cim10).await.unwrap();

    let err = session.expand(SystemId::Cim10, "nope").await.unwrap_err();
    assert_eq!(err, EngineError::UnknownNode(key("nope")));
}

#[tokio::test]
async fn test_expand_is_cached_after_success() {
    let fetcher = Arc::new(diabetes_fetcher());
    let session = SelectionSession::new(Arc::clone(&fetcher) as Arc<dyn TermFetcher>);

    session.load_roots(SystemId::Cim10).await.unwrap();
    session.expand(SystemId::Cim10, "A").await.unwrap();
    session.expand(SystemId::Cim10, "A").await.unwrap();

    // roots + one children fetch; the second expand is served from cache
    assert_eq!(fetcher.child_calls(), 2);
}

#[tokio::test]
async fn test_toggle_leaf_then_sibling_checks_chapter() {
    let session = SelectionSession::new(Arc::new(diabetes_fetcher()));
    session.load_roots(SystemId::Cim10).await.unwrap();
    session.expand(SystemId::Cim10, "A").await.unwrap();

    session.toggle(SystemId::Cim10, "B");
    assert_eq!(session.state_of(SystemId::Cim10, "B"), CheckState::Checked);
    assert_eq!(
        session.state_of(SystemId::Cim10, "A"),
        CheckState::Indeterminate
    );

    session.toggle(SystemId::Cim10, "C");
    assert_eq!(session.state_of(SystemId::Cim10, "A"), CheckState::Checked);
}

#[tokio::test]
async fn test_check_collapsed_chapter_propagates_on_expand() {
    let session = SelectionSession::new(Arc::new(diabetes_fetcher()));
    session.load_roots(SystemId::Cim10).await.unwrap();

    // The user checks the chapter before its children were ever fetched.
    session.toggle(SystemId::Cim10, "A");
    assert_eq!(session.state_of(SystemId::Cim10, "A"), CheckState::Checked);

    session.expand(SystemId::Cim10, "A").await.unwrap();

    assert_eq!(session.state_of(SystemId::Cim10, "B"), CheckState::Checked);
    assert_eq!(session.state_of(SystemId::Cim10, "C"), CheckState::Checked);
    assert_eq!(session.state_of(SystemId::Cim10, "A"), CheckState::Checked);
}

#[tokio::test]
async fn test_failed_expand_is_retryable() {
    let fetcher = Arc::new(diabetes_fetcher());
    let session = SelectionSession::new(Arc::clone(&fetcher) as Arc<dyn TermFetcher>);
    session.load_roots(SystemId::Cim10).await.unwrap();

    fetcher.fail_next.store(true, Ordering::SeqCst);
    let err = session.expand(SystemId::Cim10, "A").await.unwrap_err();
    assert!(matches!(err, EngineError::Fetch { .. }));
    assert_eq!(
        session.node(SystemId::Cim10, "A").unwrap().load_state,
        LoadState::Failed
    );
    assert_eq!(session.stats().failures, 1);

    // The retry issues a fresh fetch and succeeds.
    let children = session.expand(SystemId::Cim10, "A").await.unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(
        session.node(SystemId::Cim10, "A").unwrap().load_state,
        LoadState::Loaded
    );
}

#[tokio::test]
async fn test_malformed_dtos_are_dropped_not_fatal() {
    let fetcher = ScriptedFetcher::new()
        .level(
            SystemId::Ccam,
            None,
            vec![
                dto("HBQK002", "Dental panoramic", SystemId::Ccam, None, false),
                dto("", "No id at all", SystemId::Ccam, None, false),
                dto("A10", "Wrong system tag", SystemId::Atc, None, false),
            ],
        );
    let session = SelectionSession::new(Arc::new(fetcher));

    let roots = session.load_roots(SystemId::Ccam).await.unwrap();

    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].id, "HBQK002");
    assert_eq!(session.stats().malformed_dropped, 2);
}

#[tokio::test]
async fn test_reconcile_missing_code_yields_placeholder_group() {
    let session = SelectionSession::new(Arc::new(diabetes_fetcher()));
    session.load_roots(SystemId::Cim10).await.unwrap();
    session.expand(SystemId::Cim10, "A").await.unwrap();

    let saved = vec![SelectedCode::new("X42", "Old code", SystemId::Cim10)];
    let report = session.reconcile(SystemId::Cim10, &saved);
    assert_eq!(report.placeholders, 1);

    let groups = session.grouped_selection();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].system, SystemId::Cim10);
    assert_eq!(groups[0].codes, saved);
}

#[tokio::test]
async fn test_placeholder_replaced_by_live_node_on_expand() {
    let session = SelectionSession::new(Arc::new(diabetes_fetcher()));
    session.load_roots(SystemId::Cim10).await.unwrap();

    // "B" is saved but its level is not loaded yet: placeholder first.
    let saved = vec![SelectedCode::new("B", "Code B (saved label)", SystemId::Cim10)];
    let report = session.reconcile(SystemId::Cim10, &saved);
    assert_eq!(report.placeholders, 1);

    session.expand(SystemId::Cim10, "A").await.unwrap();

    // The live node takes over: current label, ancestor turns indeterminate.
    assert_eq!(session.state_of(SystemId::Cim10, "B"), CheckState::Checked);
    assert_eq!(
        session.state_of(SystemId::Cim10, "A"),
        CheckState::Indeterminate
    );
    let selection = session.selection();
    assert_eq!(selection.len(), 1);
    assert_eq!(selection[0].label, "Code B");
}

#[tokio::test]
async fn test_selection_round_trips_through_grouping() {
    let session = SelectionSession::new(Arc::new(diabetes_fetcher()));
    session.load_roots(SystemId::Cim10).await.unwrap();
    session.expand(SystemId::Cim10, "A").await.unwrap();

    session.toggle(SystemId::Cim10, "B");
    session.toggle(SystemId::Cim10, "C");
    let checked_before = session.checked_leaves();
    assert_eq!(checked_before, vec![key("B"), key("C")]);

    // Save: flatten + group; the fully-checked chapter exports as itself.
    let groups = session.grouped_selection();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].codes.len(), 1);
    assert_eq!(groups[0].codes[0].id, "A");

    // Reload: a fresh pass over the same tree restores the same leaves.
    session.clear_selection();
    assert!(session.checked_leaves().is_empty());
    for group in &groups {
        session.reconcile(group.system, &group.codes);
    }
    assert_eq!(session.checked_leaves(), checked_before);
}

#[tokio::test]
async fn test_selections_in_two_systems_stay_apart() {
    let fetcher = ScriptedFetcher::new()
        .level(
            SystemId::Cim10,
            None,
            vec![dto("A01", "Cholera", SystemId::Cim10, None, false)],
        )
        .level(
            SystemId::Atc,
            None,
            vec![dto("A01", "Stomatological preparations", SystemId::Atc, None, false)],
        );
    let session = SelectionSession::new(Arc::new(fetcher));
    session.load_roots(SystemId::Cim10).await.unwrap();
    session.load_roots(SystemId::Atc).await.unwrap();

    session.toggle(SystemId::Cim10, "A01");

    assert_eq!(session.state_of(SystemId::Cim10, "A01"), CheckState::Checked);
    assert_eq!(session.state_of(SystemId::Atc, "A01"), CheckState::Unchecked);

    let groups = session.grouped_selection();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].system, SystemId::Cim10);
}

#[tokio::test]
async fn test_search_results_do_not_touch_the_tree() {
    let fetcher = ScriptedFetcher::new()
        .level(
            SystemId::Cim10,
            None,
            vec![dto("A", "Chapter A", SystemId::Cim10, None, true)],
        )
        .search_result(
            SystemId::Cim10,
            "diabete",
            vec![dto("E11", "Diabète de type 2", SystemId::Cim10, Some("E10-E14"), false)],
        );
    let session = SelectionSession::new(Arc::new(fetcher));
    session.load_roots(SystemId::Cim10).await.unwrap();

    let hits = session.search(SystemId::Cim10, "diabete").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "E11");

    // The hit is not merged into the tree and no load state moved.
    assert!(session.node(SystemId::Cim10, "E11").is_none());
    assert_eq!(
        session.node(SystemId::Cim10, "A").unwrap().load_state,
        LoadState::NotLoaded
    );
}

#[tokio::test]
async fn test_search_is_cached_per_normalized_query() {
    let fetcher = Arc::new(
        ScriptedFetcher::new().search_result(
            SystemId::Cim10,
            "diabete",
            vec![dto("E11", "Diabète de type 2", SystemId::Cim10, None, false)],
        ),
    );
    let session = SelectionSession::new(Arc::clone(&fetcher) as Arc<dyn TermFetcher>);

    let first = session.search(SystemId::Cim10, "diabete").await.unwrap();
    // Same query, cache hit even though the raw string differs.
    let second = session.search(SystemId::Cim10, "  DIABETE ").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(fetcher.search_calls(), 1);
    assert_eq!(session.stats().search_cache_hits, 1);
}

#[tokio::test]
async fn test_visible_matches_filter_tree() {
    let session = SelectionSession::new(Arc::new(diabetes_fetcher()));
    session.load_roots(SystemId::Cim10).await.unwrap();
    session.expand(SystemId::Cim10, "A").await.unwrap();

    let visible = session.visible_matches(SystemId::Cim10, "code b");
    assert!(visible.contains(&key("B")));
    assert!(visible.contains(&key("A"))); // ancestor of the match
    assert!(!visible.contains(&key("C")));
}
