//! assetscope-storage: Record model and repository abstraction layer
//!
//! This crate provides the storage abstraction for assetscope, including:
//! - Typed records, schemas and per-type access capabilities
//! - A composable predicate language and lazy query sets
//! - Repository traits for resources, grants and subscriptions
//! - In-memory implementation for testing and embedding
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             assetscope-storage              │
//! ├─────────────────────────────────────────────┤
//! │  record.rs    - Records, schemas, grants    │
//! │  predicate.rs - Predicates and query sets   │
//! │  traits.rs    - Repository traits           │
//! │  memory.rs    - In-memory implementation    │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod predicate;
pub mod record;
pub mod traits;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use memory::MemoryRepository;
pub use predicate::{Predicate, QuerySet, RecordLookup};
pub use record::{
    Capability, FieldDef, FieldKind, FieldValue, Grant, ObjectId, Record, Schema,
    DISCOVERABLE_FIELD, PARENT_FIELD, PK_FIELD,
};
pub use traits::{GrantRepository, ResourceRepository, SubscriptionRepository};
