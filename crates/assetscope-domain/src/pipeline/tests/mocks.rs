//! Mock backends and fixtures for pipeline testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use assetscope_storage::{MemoryRepository, Record};
use async_trait::async_trait;

use crate::pipeline::{ListPipeline, PipelineConfig};
use crate::search::{
    IndexFilter, MemorySearchIndex, QueryDialect, SearchBackend, SearchConfig, SearchHit,
    SearchQuery, SearchResult,
};
use crate::test_support::{add_asset, add_collection, library, make_public};

/// Search backend that counts queries and can claim a foreign dialect.
pub struct RecordingBackend {
    inner: Arc<MemorySearchIndex>,
    dialect: QueryDialect,
    searches: AtomicUsize,
}

impl RecordingBackend {
    pub fn new(inner: Arc<MemorySearchIndex>) -> Self {
        Self {
            inner,
            dialect: QueryDialect::Fielded,
            searches: AtomicUsize::new(0),
        }
    }

    pub fn with_dialect(mut self, dialect: QueryDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn setup_calls(&self) -> usize {
        self.inner.setup_calls()
    }
}

#[async_trait]
impl SearchBackend for RecordingBackend {
    fn name(&self) -> &str {
        match self.dialect {
            QueryDialect::Fielded => "recording",
            QueryDialect::Other(name) => name,
        }
    }

    fn dialect(&self) -> QueryDialect {
        self.dialect
    }

    async fn setup(&self) -> SearchResult<()> {
        self.inner.setup().await
    }

    fn has_field(&self, content_type: &str, field: &str) -> bool {
        self.inner.has_field(content_type, field)
    }

    async fn search(
        &self,
        query: &SearchQuery,
        filter: &IndexFilter,
    ) -> SearchResult<Vec<SearchHit>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.search(query, filter).await
    }

    async fn count(&self, filter: &IndexFilter) -> SearchResult<usize> {
        self.inner.count(filter).await
    }
}

pub type TestPipeline = ListPipeline<MemoryRepository, RecordingBackend>;

/// Library used across the suite.
///
/// - collection 1 (`abc123`), owned by alice, public and discoverable
/// - collection 2, owned by bob, private
/// - assets 10..=15 of mixed types, spread over the collections and root
pub fn library_fixture() -> Arc<MemoryRepository> {
    let repo = library();
    repo.insert_record(
        "collection",
        Record::new(1)
            .with("uid", "abc123")
            .with("owner", "alice")
            .with("discoverable_when_public", true),
    )
    .unwrap();
    repo.grant("alice", "kpi.view_collection", "collection", 1);
    make_public(&repo, "collection", 1);
    add_collection(&repo, 2, "bob", false);

    add_asset(&repo, 10, "alice", "survey", None);
    add_asset(&repo, 11, "alice", "question", Some(1));
    add_asset(&repo, 12, "alice", "block", Some(1));
    add_asset(&repo, 13, "alice", "template", Some(1));
    add_asset(&repo, 14, "alice", "question", Some(2));
    add_asset(&repo, 15, "bob", "survey", None);
    repo
}

pub fn pipeline_with(
    repo: &Arc<MemoryRepository>,
    backend: RecordingBackend,
    search: SearchConfig,
) -> (TestPipeline, Arc<RecordingBackend>) {
    let backend = Arc::new(backend);
    let config = PipelineConfig {
        search,
        ..PipelineConfig::default()
    };
    let pipeline = ListPipeline::new(Arc::clone(repo), Arc::clone(&backend), config);
    (pipeline, backend)
}

pub fn pipeline(
    repo: &Arc<MemoryRepository>,
    index: MemorySearchIndex,
) -> (TestPipeline, Arc<RecordingBackend>) {
    pipeline_with(
        repo,
        RecordingBackend::new(Arc::new(index)),
        SearchConfig::default(),
    )
}
