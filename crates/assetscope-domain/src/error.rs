//! Domain error types for filtering operations.

use assetscope_storage::StorageError;
use thiserror::Error;

use crate::search::SearchError;

/// Domain-specific errors for filtering operations.
///
/// Unknown-field mismatches from short-circuited queries and an unpopulated
/// search index are absorbed inside the domain layer and never show up here.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Repository failure, including structural precondition violations and
    /// identifier coercion failures.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Search index failure.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// A request parameter carries a value outside its recognized set.
    #[error("invalid value for parameter '{name}': {value}")]
    InvalidParameter { name: String, value: String },
}

impl DomainError {
    /// True for errors caused by the caller's input rather than by
    /// configuration or internal faults.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidParameter { .. } | DomainError::Search(SearchError::BadQuery { .. })
        )
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
