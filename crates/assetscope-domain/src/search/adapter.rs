//! Drives a [`SearchBackend`] on behalf of the search filter.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::backend::{IndexFilter, QueryDialect, SearchBackend, GRANTEE_FIELD};
use super::error::{SearchError, SearchResult};
use super::query::{parse_query, SearchQuery};
use crate::principal::Principal;

/// Default upper bound on a single index query.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime settings for [`SearchIndexAdapter`].
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Upper bound on each index round-trip.
    pub timeout: Duration,
    /// Push the grantee restriction into the index when it supports one.
    pub grantee_prefilter: bool,
    /// Treat an index without any document for the type as not populated.
    /// When false, zero matches always mean zero matches.
    pub empty_index_fallback: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SEARCH_TIMEOUT,
            grantee_prefilter: true,
            empty_index_fallback: true,
        }
    }
}

/// What the index said about a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// External identifiers of matching documents, unordered and unscored.
    Matches(BTreeSet<String>),
    /// Nothing matched and the index holds no document of the type at all.
    IndexNotPopulated,
}

/// Wraps a search backend with lazy setup, a timeout and the grantee
/// prefilter.
pub struct SearchIndexAdapter<B: SearchBackend> {
    backend: Arc<B>,
    config: SearchConfig,
    setup: OnceCell<()>,
}

impl<B: SearchBackend> SearchIndexAdapter<B> {
    pub fn new(backend: Arc<B>, config: SearchConfig) -> Self {
        Self {
            backend,
            config,
            setup: OnceCell::new(),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// True once setup has completed successfully.
    pub fn is_ready(&self) -> bool {
        self.setup.initialized()
    }

    /// Runs backend setup at most once. Concurrent first callers wait for the
    /// same attempt; a failed attempt leaves the cell empty for the next
    /// caller to retry.
    async fn ensure_setup(&self) -> SearchResult<()> {
        self.setup
            .get_or_try_init(|| async {
                info!(backend = self.backend.name(), "setting up search index");
                self.backend.setup().await
            })
            .await
            .map(|_| ())
    }

    /// Searches `content_type` documents for `query` on behalf of `principal`.
    ///
    /// `principal` is expected to be resolved already, so anonymous requests
    /// carry the shared identity's username.
    #[instrument(
        skip(self, principal),
        fields(backend = self.backend.name(), user = %principal.username)
    )]
    pub async fn search(
        &self,
        query: &str,
        content_type: &str,
        principal: &Principal,
    ) -> SearchResult<SearchOutcome> {
        if let QueryDialect::Other(dialect) = self.backend.dialect() {
            warn!(dialect, "configured search backend speaks an unsupported dialect");
            return Err(SearchError::BackendUnsupported {
                backend: self.backend.name().to_string(),
            });
        }

        self.ensure_setup().await?;
        let parsed = parse_query(query)?;

        let type_filter = IndexFilter::for_type(content_type);
        let filter = if self.config.grantee_prefilter
            && self.backend.has_field(content_type, GRANTEE_FIELD)
        {
            type_filter.clone().with_grantee(principal.username.clone())
        } else {
            type_filter.clone()
        };

        match timeout(self.config.timeout, self.run(&parsed, &filter, &type_filter)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout {
                duration_ms: self.config.timeout.as_millis() as u64,
            }),
        }
    }

    async fn run(
        &self,
        query: &SearchQuery,
        filter: &IndexFilter,
        type_filter: &IndexFilter,
    ) -> SearchResult<SearchOutcome> {
        let hits = self.backend.search(query, filter).await?;
        if hits.is_empty() && self.config.empty_index_fallback {
            // Count with the type restriction only, never the grantee.
            if self.backend.count(type_filter).await? == 0 {
                warn!(
                    content_type = %type_filter.content_type,
                    "search index holds no documents for type; falling back"
                );
                return Ok(SearchOutcome::IndexNotPopulated);
            }
        }
        debug!(hits = hits.len(), "search completed");
        Ok(SearchOutcome::Matches(
            hits.into_iter().map(|hit| hit.django_id).collect(),
        ))
    }
}
