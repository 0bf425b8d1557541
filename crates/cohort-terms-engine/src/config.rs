//! Configuration types for a selection session.

use std::time::Duration;

/// Configuration for a [`SelectionSession`](crate::SelectionSession).
///
/// # Example
///
/// ```rust
/// use cohort_terms_engine::{SearchCacheConfig, SessionConfig};
/// use std::time::Duration;
///
/// let config = SessionConfig::builder()
///     .with_search_cache(SearchCacheConfig {
///         max_entries: 500,
///         ttl: Duration::from_secs(60),
///     })
///     .with_max_search_results(200)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Search-result cache configuration (None = caching disabled).
    pub search_cache: Option<SearchCacheConfig>,
    /// Maximum number of flat search results kept per query (None = unlimited).
    pub max_search_results: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            search_cache: Some(SearchCacheConfig::default()),
            max_search_results: None,
        }
    }
}

impl SessionConfig {
    /// Creates a new builder for SessionConfig.
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::default()
    }
}

/// Builder for SessionConfig.
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    search_cache: Option<SearchCacheConfig>,
    max_search_results: Option<usize>,
}

impl SessionConfigBuilder {
    /// Enables search-result caching with the given configuration.
    pub fn with_search_cache(mut self, cache: SearchCacheConfig) -> Self {
        self.search_cache = Some(cache);
        self
    }

    /// Sets the maximum number of flat search results per query.
    pub fn with_max_search_results(mut self, max: usize) -> Self {
        self.max_search_results = Some(max);
        self
    }

    /// Builds the SessionConfig.
    ///
    /// Note: a builder that never called `with_search_cache` produces a
    /// session without one, unlike `SessionConfig::default()` which caches.
    pub fn build(self) -> SessionConfig {
        SessionConfig {
            search_cache: self.search_cache,
            max_search_results: self.max_search_results,
        }
    }
}

/// Configuration for the flat-search result cache.
#[derive(Debug, Clone)]
pub struct SearchCacheConfig {
    /// Maximum number of cached queries.
    pub max_entries: usize,
    /// Time-to-live for cached entries.
    pub ttl: Duration,
}

impl Default for SearchCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(120),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert!(config.search_cache.is_some());
        assert!(config.max_search_results.is_none());
    }

    #[test]
    fn test_session_config_builder() {
        let config = SessionConfig::builder()
            .with_search_cache(SearchCacheConfig {
                max_entries: 50,
                ttl: Duration::from_secs(10),
            })
            .with_max_search_results(100)
            .build();

        assert_eq!(config.search_cache.as_ref().unwrap().max_entries, 50);
        assert_eq!(config.max_search_results, Some(100));
    }

    #[test]
    fn test_builder_without_cache() {
        let config = SessionConfig::builder().build();
        assert!(config.search_cache.is_none());
    }

    #[test]
    fn test_search_cache_config_default() {
        let cache = SearchCacheConfig::default();
        assert_eq!(cache.max_entries, 1_000);
        assert_eq!(cache.ttl, Duration::from_secs(120));
    }
}
