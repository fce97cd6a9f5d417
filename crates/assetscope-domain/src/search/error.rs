//! Search error types.

use thiserror::Error;

/// Errors raised while querying the full-text index.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query string was rejected by the query parser.
    #[error(
        "bad query: {message}{}",
        .position.map(|p| format!(" at position {p}")).unwrap_or_default()
    )]
    BadQuery {
        message: String,
        position: Option<usize>,
    },

    /// The configured backend does not speak the fielded query dialect.
    /// A deployment error; never retried.
    #[error("search backend '{backend}' does not support the fielded query dialect")]
    BackendUnsupported { backend: String },

    /// Lazy index setup failed.
    #[error("search index setup failed: {message}")]
    SetupFailed { message: String },

    /// The index did not answer in time.
    #[error("search timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Backend-specific failure.
    #[error("search backend error: {message}")]
    Backend { message: String },
}

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;
