//! Full-text search over an external index.
//!
//! # Flow
//!
//! ```text
//! q ──► ShortCircuiter ──hit──► direct predicate
//!            │
//!           miss
//!            ▼
//!   SearchIndexAdapter ──► SearchBackend (lazy setup, timeout)
//!            │
//!            ├── IndexNotPopulated ──► base set unchanged
//!            ▼
//!   ResultSetIntersector ──► base ∩ matches
//! ```

mod adapter;
mod backend;
mod error;
mod filter;
mod intersect;
mod memory;
mod query;

pub use adapter::{SearchConfig, SearchIndexAdapter, SearchOutcome, DEFAULT_SEARCH_TIMEOUT};
pub use backend::{
    IndexFilter, QueryDialect, SearchBackend, SearchHit, CONTENT_TYPE_FIELD, GRANTEE_FIELD,
    ID_FIELD,
};
pub use error::{SearchError, SearchResult};
pub use filter::SearchFilter;
pub use intersect::ResultSetIntersector;
pub use memory::{MemorySearchIndex, SearchDocument};
pub use query::{parse_query, SearchQuery, DEFAULT_FIELD, MAX_NESTING};
