//! On-demand loading of hierarchy levels.
//!
//! The loader sits between the fetch collaborator and the node store. It
//! guarantees three things the UI relies on:
//!
//! - **at-most-once fetching** — concurrent expands of the same node share
//!   one in-flight future and therefore one underlying fetch; a level that
//!   loaded successfully is never fetched again within the session;
//! - **retryability** — a failed fetch leaves the node `Failed` and the
//!   next expand issues a fresh fetch, so the UI can offer retry at the
//!   exact node that failed;
//! - **cancellation safety** — collapsing a node (or tearing down the
//!   view) aborts its fetch and advances the node's epoch; a response that
//!   races past the abort is discarded by the epoch guard before any store
//!   write, so a stale payload can never corrupt a node that has since
//!   been re-expanded.

use std::collections::HashMap;
use std::sync::Arc;

use cohort_terms::{HierarchyNode, LoadState, NodeDto, NodeKey, SystemId};
use futures::future::{AbortHandle, Abortable, BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::cache::SearchCache;
use crate::config::SessionConfig;
use crate::error::{target_name, EngineError, EngineResult};
use crate::selection::SelectionEngine;
use crate::store::NodeStore;
use crate::traits::TermFetcher;

/// One fetchable level: a system's roots (`None`) or a node's children.
type FetchKey = (SystemId, Option<String>);

/// The future shared by every caller of one in-flight load.
type SharedLoad = Shared<BoxFuture<'static, EngineResult<Vec<HierarchyNode>>>>;

/// Counters describing the loader's traffic.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoaderStats {
    /// Fetches actually issued to the collaborator (expands and searches).
    pub fetches_issued: u64,
    /// Expand calls that joined an already in-flight fetch.
    pub dedup_hits: u64,
    /// Searches served from the result cache.
    pub search_cache_hits: u64,
    /// Responses dropped because the target's epoch had advanced.
    pub stale_discarded: u64,
    /// DTOs dropped for a missing id or a mismatched system tag.
    pub malformed_dropped: u64,
    /// Fetches that ended in a collaborator error.
    pub failures: u64,
}

struct LoaderInner {
    fetcher: Arc<dyn TermFetcher>,
    store: Arc<RwLock<NodeStore>>,
    selection: Arc<RwLock<SelectionEngine>>,
    inflight: Mutex<HashMap<FetchKey, SharedLoad>>,
    aborts: Mutex<HashMap<FetchKey, AbortHandle>>,
    epochs: Mutex<HashMap<FetchKey, u64>>,
    stats: RwLock<LoaderStats>,
}

impl LoaderInner {
    fn epoch_of(&self, key: &FetchKey) -> u64 {
        self.epochs.lock().get(key).copied().unwrap_or(0)
    }

    fn is_current(&self, key: &FetchKey, epoch: u64) -> bool {
        self.epoch_of(key) == epoch
    }

    /// Drops the in-flight bookkeeping of a finished fetch.
    fn finish(&self, key: &FetchKey) {
        self.inflight.lock().remove(key);
        self.aborts.lock().remove(key);
    }
}

/// Lazily fetches tree levels and flat search results.
///
/// Cloneable-by-`Arc` internals make the loader's futures `'static`: the
/// session can drop while a fetch is still settling without dangling
/// borrows, and every deduplicated caller polls the same shared future.
pub struct LazyLoader {
    inner: Arc<LoaderInner>,
    search_cache: Option<SearchCache>,
    max_search_results: Option<usize>,
}

impl LazyLoader {
    /// Creates a loader over the session's shared store and selection.
    pub fn new(
        fetcher: Arc<dyn TermFetcher>,
        store: Arc<RwLock<NodeStore>>,
        selection: Arc<RwLock<SelectionEngine>>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(LoaderInner {
                fetcher,
                store,
                selection,
                inflight: Mutex::new(HashMap::new()),
                aborts: Mutex::new(HashMap::new()),
                epochs: Mutex::new(HashMap::new()),
                stats: RwLock::new(LoaderStats::default()),
            }),
            search_cache: config.search_cache.as_ref().map(SearchCache::new),
            max_search_results: config.max_search_results,
        }
    }

    /// Loads the roots of a system, fetching them on first call.
    pub async fn load_roots(&self, system: SystemId) -> EngineResult<Vec<HierarchyNode>> {
        self.load_level(system, None).await
    }

    /// Loads the children of a node, fetching them on first call.
    ///
    /// The node must already be in the store (it arrived with its own
    /// parent's level). Expanding a node whose previous fetch failed
    /// retries.
    pub async fn expand(&self, system: SystemId, node_id: &str) -> EngineResult<Vec<HierarchyNode>> {
        if !self.inner.store.read().contains(system, node_id) {
            let key = NodeKey::new(system, node_id);
            warn!(node = %key, "expand on a node absent from the store");
            return Err(EngineError::UnknownNode(key));
        }
        self.load_level(system, Some(node_id.to_string())).await
    }

    /// Cancels the in-flight fetch of a node's children, if any.
    ///
    /// Called on node collapse. Advances the target's epoch (so a response
    /// that already left the collaborator is discarded on arrival), aborts
    /// the fetch future, and rolls a `Loading` node back to `NotLoaded`.
    pub fn cancel_expand(&self, system: SystemId, node_id: &str) {
        self.cancel(system, Some(node_id.to_string()));
    }

    /// Cancels the in-flight root fetch of a system, if any.
    ///
    /// Called on view teardown.
    pub fn cancel_roots(&self, system: SystemId) {
        self.cancel(system, None);
    }

    /// Flat, non-hierarchical code lookup.
    ///
    /// Results never enter the node store and no `load_state` changes;
    /// dropping the returned future abandons the request. Cached per
    /// normalized query when a search cache is configured.
    pub async fn search(&self, system: SystemId, query: &str) -> EngineResult<Vec<NodeDto>> {
        let cache_key = SearchCache::key(system, query);
        if let Some(cache) = &self.search_cache {
            if let Some(hit) = cache.get(&cache_key) {
                self.inner.stats.write().search_cache_hits += 1;
                return Ok(hit);
            }
        }

        self.inner.stats.write().fetches_issued += 1;
        let dtos = self
            .inner
            .fetcher
            .fetch_search(system, query)
            .await
            .map_err(|err| {
                self.inner.stats.write().failures += 1;
                EngineError::Fetch {
                    system,
                    target: format!("search {query:?}"),
                    message: err.to_string(),
                }
            })?;

        let mut results = sanitize(system, dtos, &self.inner.stats);
        if let Some(max) = self.max_search_results {
            results.truncate(max);
        }
        if let Some(cache) = &self.search_cache {
            cache.set(cache_key, results.clone());
        }
        Ok(results)
    }

    /// Loader traffic counters.
    pub fn stats(&self) -> LoaderStats {
        *self.inner.stats.read()
    }

    /// Statistics of the search cache, when one is configured.
    pub fn search_cache_stats(&self) -> Option<crate::cache::SearchCacheStats> {
        self.search_cache.as_ref().map(SearchCache::stats)
    }

    async fn load_level(
        &self,
        system: SystemId,
        parent: Option<String>,
    ) -> EngineResult<Vec<HierarchyNode>> {
        // Fast path: the level is already cached.
        {
            let store = self.inner.store.read();
            if let Some(children) = cached_level(&store, system, parent.as_deref()) {
                return Ok(children);
            }
        }

        let key: FetchKey = (system, parent.clone());
        let shared = {
            let mut inflight = self.inner.inflight.lock();
            match inflight.get(&key) {
                Some(existing) => {
                    self.inner.stats.write().dedup_hits += 1;
                    existing.clone()
                }
                None => {
                    let fresh = self.spawn_fetch(system, parent);
                    inflight.insert(key, fresh.clone());
                    fresh
                }
            }
        };

        shared.await
    }

    /// Builds the single future that performs one level fetch.
    ///
    /// The future owns `Arc`s of everything it touches, making it
    /// `'static` and shareable between deduplicated callers.
    fn spawn_fetch(&self, system: SystemId, parent: Option<String>) -> SharedLoad {
        let key: FetchKey = (system, parent.clone());
        let epoch = self.inner.epoch_of(&key);

        self.inner.store.write().mark_loading(system, parent.as_deref());
        self.inner.stats.write().fetches_issued += 1;

        let (abort_handle, abort_registration) = AbortHandle::new_pair();
        self.inner.aborts.lock().insert(key.clone(), abort_handle);

        let inner = Arc::clone(&self.inner);
        async move {
            let target = target_name(parent.as_deref());
            let fetched = Abortable::new(
                inner.fetcher.fetch_children(system, parent.as_deref()),
                abort_registration,
            )
            .await;

            match fetched {
                // Aborted by cancel(): the epoch is already advanced and
                // the bookkeeping cleaned up there.
                Err(futures::future::Aborted) => Err(EngineError::Cancelled { system, target }),
                Ok(Err(err)) => {
                    if inner.is_current(&key, epoch) {
                        inner.store.write().mark_failed(system, parent.as_deref());
                        inner.stats.write().failures += 1;
                        inner.finish(&key);
                    } else {
                        inner.stats.write().stale_discarded += 1;
                    }
                    Err(EngineError::Fetch {
                        system,
                        target,
                        message: err.to_string(),
                    })
                }
                Ok(Ok(dtos)) => {
                    let inserted = {
                        let mut store = inner.store.write();
                        if !inner.is_current(&key, epoch) {
                            inner.stats.write().stale_discarded += 1;
                            debug!(
                                system = %system,
                                target = %target,
                                "discarding response from a superseded fetch"
                            );
                            return Err(EngineError::Cancelled { system, target });
                        }
                        let nodes = into_nodes(sanitize(system, dtos, &inner.stats), parent.as_deref());
                        store.put_children(system, parent.as_deref(), nodes)
                    };

                    {
                        let store = inner.store.read();
                        let mut selection = inner.selection.write();
                        let parent_key = parent
                            .as_ref()
                            .map(|id| NodeKey::new(system, id.clone()));
                        selection.on_children_loaded(&store, parent_key.as_ref(), &inserted);
                    }

                    inner.finish(&key);

                    let store = inner.store.read();
                    Ok(inserted
                        .iter()
                        .filter_map(|k| store.node_by_key(k).cloned())
                        .collect())
                }
            }
        }
        .boxed()
        .shared()
    }

    fn cancel(&self, system: SystemId, parent: Option<String>) {
        let key: FetchKey = (system, parent.clone());
        {
            let mut epochs = self.inner.epochs.lock();
            *epochs.entry(key.clone()).or_insert(0) += 1;
        }
        if let Some(handle) = self.inner.aborts.lock().remove(&key) {
            handle.abort();
        }
        self.inner.inflight.lock().remove(&key);
        self.inner
            .store
            .write()
            .reset_not_loaded(system, parent.as_deref());
    }
}

impl std::fmt::Debug for LazyLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyLoader")
            .field("stats", &self.stats())
            .field("search_cache", &self.search_cache)
            .finish()
    }
}

/// The level's nodes when it is already cached, `None` otherwise.
fn cached_level(
    store: &NodeStore,
    system: SystemId,
    parent: Option<&str>,
) -> Option<Vec<HierarchyNode>> {
    if store.load_state(system, parent) != LoadState::Loaded {
        return None;
    }
    match parent {
        Some(id) => store
            .children_of(system, id)
            .map(|children| children.into_iter().cloned().collect()),
        None => store
            .roots(system)
            .map(|roots| roots.into_iter().cloned().collect()),
    }
}

/// Drops malformed DTOs (missing id, wrong system tag) with a warning;
/// the rest of the batch is unaffected.
fn sanitize(system: SystemId, dtos: Vec<NodeDto>, stats: &RwLock<LoaderStats>) -> Vec<NodeDto> {
    let mut kept = Vec::with_capacity(dtos.len());
    for dto in dtos {
        if dto.id.trim().is_empty() {
            warn!(system = %system, label = %dto.label, "dropping node without id");
            stats.write().malformed_dropped += 1;
            continue;
        }
        if dto.system != system {
            warn!(
                expected = %system,
                got = %dto.system,
                id = %dto.id,
                "dropping node tagged with another system"
            );
            stats.write().malformed_dropped += 1;
            continue;
        }
        kept.push(dto);
    }
    kept
}

/// Converts sanitized DTOs into store nodes under `parent`.
fn into_nodes(dtos: Vec<NodeDto>, parent: Option<&str>) -> Vec<HierarchyNode> {
    dtos.into_iter()
        .map(|dto| HierarchyNode {
            id: dto.id,
            label: dto.label,
            system: dto.system,
            parent_id: parent.map(str::to_string),
            child_ids: if dto.has_children { None } else { Some(Vec::new()) },
            is_leaf: !dto.has_children,
            load_state: if dto.has_children {
                LoadState::NotLoaded
            } else {
                LoadState::Loaded
            },
        })
        .collect()
}
