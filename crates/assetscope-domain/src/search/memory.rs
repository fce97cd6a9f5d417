//! In-process search index.
//!
//! Documents are tokenized on non-alphanumeric boundaries and lower-cased.
//! Useful for tests and single-node deployments.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::backend::{
    IndexFilter, QueryDialect, SearchBackend, SearchHit, CONTENT_TYPE_FIELD, GRANTEE_FIELD,
    ID_FIELD,
};
use super::error::{SearchError, SearchResult};
use super::query::SearchQuery;

/// A document in the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub content_type: String,
    pub django_id: String,
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub users_granted_permission: Vec<String>,
}

impl SearchDocument {
    pub fn new(content_type: impl Into<String>, django_id: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            django_id: django_id.into(),
            fields: BTreeMap::new(),
            users_granted_permission: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn granted_to(mut self, username: impl Into<String>) -> Self {
        self.users_granted_permission.push(username.into());
        self
    }

    fn tokens(&self, field: &str) -> Vec<String> {
        self.fields.get(field).map(|v| tokenize(v)).unwrap_or_default()
    }

    fn passes(&self, filter: &IndexFilter) -> bool {
        self.content_type == filter.content_type
            && filter
                .grantee
                .as_ref()
                .map_or(true, |g| self.users_granted_permission.contains(g))
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// True if `needle` occurs as a contiguous run inside `haystack`.
fn contains_run(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

fn matches(doc: &SearchDocument, query: &SearchQuery) -> bool {
    match query {
        SearchQuery::Empty => false,
        SearchQuery::Term { field, text } => contains_run(&doc.tokens(field), &tokenize(text)),
        SearchQuery::Phrase { field, words } => {
            let words: Vec<String> = words.iter().flat_map(|w| tokenize(w)).collect();
            contains_run(&doc.tokens(field), &words)
        }
        SearchQuery::Prefix { field, prefix } => {
            doc.tokens(field).iter().any(|t| t.starts_with(prefix.as_str()))
        }
        SearchQuery::And(parts) => parts.iter().all(|q| matches(doc, q)),
        SearchQuery::Or(parts) => parts.iter().any(|q| matches(doc, q)),
        SearchQuery::Not(inner) => !matches(doc, inner),
    }
}

/// In-memory implementation of [`SearchBackend`] using DashMap.
#[derive(Debug, Default)]
pub struct MemorySearchIndex {
    /// Documents keyed by `(content_type, django_id)`.
    documents: DashMap<(String, String), SearchDocument>,
    /// Content types whose documents carry the grantee field.
    permission_types: DashSet<String>,
    ready: AtomicBool,
    setup_calls: AtomicUsize,
    failing_setups: AtomicUsize,
    setup_delay: Option<Duration>,
    search_delay: Option<Duration>,
}

impl MemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Setup sleeps this long before completing.
    pub fn with_setup_delay(mut self, delay: Duration) -> Self {
        self.setup_delay = Some(delay);
        self
    }

    /// Every search sleeps this long before answering.
    pub fn with_search_delay(mut self, delay: Duration) -> Self {
        self.search_delay = Some(delay);
        self
    }

    /// The next `n` setup attempts fail.
    pub fn fail_next_setups(&self, n: usize) {
        self.failing_setups.store(n, Ordering::SeqCst);
    }

    /// Declares that documents of this type carry a grantee list.
    pub fn enable_permission_field(&self, content_type: impl Into<String>) {
        self.permission_types.insert(content_type.into());
    }

    /// Adds or replaces a document.
    pub fn index(&self, document: SearchDocument) {
        let key = (document.content_type.clone(), document.django_id.clone());
        self.documents.insert(key, document);
    }

    pub fn remove(&self, content_type: &str, django_id: &str) -> Option<SearchDocument> {
        self.documents
            .remove(&(content_type.to_string(), django_id.to_string()))
            .map(|(_, doc)| doc)
    }

    /// Number of setup attempts observed so far.
    pub fn setup_calls(&self) -> usize {
        self.setup_calls.load(Ordering::SeqCst)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn ensure_ready(&self) -> SearchResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(SearchError::Backend {
                message: "index queried before setup".to_string(),
            })
        }
    }
}

#[async_trait]
impl SearchBackend for MemorySearchIndex {
    fn name(&self) -> &str {
        "memory"
    }

    fn dialect(&self) -> QueryDialect {
        QueryDialect::Fielded
    }

    async fn setup(&self) -> SearchResult<()> {
        self.setup_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.setup_delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .failing_setups
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(SearchError::SetupFailed {
                message: "index storage unavailable".to_string(),
            });
        }
        self.ready.store(true, Ordering::SeqCst);
        debug!(documents = self.documents.len(), "memory index ready");
        Ok(())
    }

    fn has_field(&self, content_type: &str, field: &str) -> bool {
        match field {
            CONTENT_TYPE_FIELD | ID_FIELD => true,
            GRANTEE_FIELD => self.permission_types.contains(content_type),
            _ => self
                .documents
                .iter()
                .any(|doc| doc.content_type == content_type && doc.fields.contains_key(field)),
        }
    }

    #[instrument(skip(self, query))]
    async fn search(
        &self,
        query: &SearchQuery,
        filter: &IndexFilter,
    ) -> SearchResult<Vec<SearchHit>> {
        self.ensure_ready()?;
        if let Some(delay) = self.search_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .documents
            .iter()
            .filter(|doc| doc.passes(filter) && matches(doc, query))
            .map(|doc| SearchHit {
                django_id: doc.django_id.clone(),
                score: 1.0,
            })
            .collect())
    }

    async fn count(&self, filter: &IndexFilter) -> SearchResult<usize> {
        self.ensure_ready()?;
        Ok(self.documents.iter().filter(|doc| doc.passes(filter)).count())
    }
}
