//! Search backend abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::SearchResult;
use super::query::SearchQuery;

/// Document field holding the content type of the indexed object.
pub const CONTENT_TYPE_FIELD: &str = "django_ct";

/// Document field holding the external identifier of the indexed object.
pub const ID_FIELD: &str = "django_id";

/// Document field listing the usernames that may view the object.
pub const GRANTEE_FIELD: &str = "users_granted_permission";

/// Query language a backend understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryDialect {
    /// `field:term` with boolean operators, as parsed by [`super::parse_query`].
    Fielded,
    /// Anything else; the adapter refuses to drive such a backend.
    Other(&'static str),
}

/// Conjunctive restriction applied to every search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFilter {
    pub content_type: String,
    /// When set, only documents whose grantee list contains this name match.
    pub grantee: Option<String>,
}

impl IndexFilter {
    pub fn for_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            grantee: None,
        }
    }

    pub fn with_grantee(mut self, grantee: impl Into<String>) -> Self {
        self.grantee = Some(grantee.into());
        self
    }
}

/// A single match. The score is carried for completeness but never used for
/// filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub django_id: String,
    pub score: f32,
}

/// A full-text index holding documents for one or more content types.
///
/// Implementations must be thread-safe; a single backend is shared by every
/// request.
#[async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    /// Backend name used in logs and errors.
    fn name(&self) -> &str;

    fn dialect(&self) -> QueryDialect;

    /// Prepares the index for queries. Called at most once per successful
    /// setup by [`super::SearchIndexAdapter`].
    async fn setup(&self) -> SearchResult<()>;

    /// Whether documents of this content type carry the given field.
    fn has_field(&self, content_type: &str, field: &str) -> bool;

    /// Runs a parsed query under the given filter. Results are unordered.
    async fn search(&self, query: &SearchQuery, filter: &IndexFilter)
        -> SearchResult<Vec<SearchHit>>;

    /// Number of documents matching the filter alone.
    async fn count(&self, filter: &IndexFilter) -> SearchResult<usize>;
}
