//! Storage error types.

use thiserror::Error;

/// Storage-specific errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No schema is registered for the content type.
    #[error("schema not found: {content_type}")]
    SchemaNotFound { content_type: String },

    /// A predicate or record names a field the content type does not declare.
    ///
    /// This is the distinguishable "unknown field for this type" condition;
    /// callers that apply one filter across heterogeneous types recover from
    /// it locally instead of surfacing it.
    #[error("unknown field '{field}' on content type '{content_type}'")]
    UnknownField { content_type: String, field: String },

    /// Record not found.
    #[error("record not found: {content_type}:{pk}")]
    RecordNotFound { content_type: String, pk: String },

    /// Record does not conform to its schema.
    #[error("invalid record: {message}")]
    InvalidRecord { message: String },

    /// A schema lacks the structure an operation requires.
    #[error("structural precondition violated: {message}")]
    StructuralPrecondition { message: String },

    /// An external identifier could not be coerced to the native identifier type.
    #[error("cannot coerce identifier '{value}' to {expected}")]
    IdentifierCoercion { value: String, expected: &'static str },

    /// Internal error.
    #[error("internal storage error: {message}")]
    InternalError { message: String },
}

impl StorageError {
    /// Returns true for the recoverable unknown-field condition.
    pub fn is_unknown_field(&self) -> bool {
        matches!(self, StorageError::UnknownField { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
