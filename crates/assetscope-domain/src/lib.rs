//! assetscope-domain: Permission-aware filtering of resource collections
//!
//! This crate narrows typed collections to what a principal may see and
//! layers free-text search and report grouping on top:
//! - Object-level visibility (ownership, grants, public discoverability,
//!   subscriptions) and its related/assigned/owner variants
//! - Short-circuiting of common search expressions
//! - Full-text search through a pluggable index backend
//! - Attachment sorting and grouping
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              assetscope-domain              │
//! ├─────────────────────────────────────────────┤
//! │  access/      - Visible-set computation     │
//! │  query/       - Query short-circuiting      │
//! │  search/      - Index adapter & intersector │
//! │  attachments/ - Report grouping             │
//! │  pipeline     - Per-request composition     │
//! └─────────────────────────────────────────────┘
//! ```

pub mod access;
pub mod attachments;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod principal;
pub mod query;
pub mod search;

#[cfg(test)]
mod test_support;

// Re-export commonly used types at the crate root
pub use access::{
    AccessStore, AssignedPermissionFilter, ObjectPermissionsFilter, OwnerFilter,
    RelatedResourceFilter, ViewAction,
};
pub use attachments::{
    Attachment, AttachmentGroupingEngine, AttachmentQuery, AttachmentView, GroupedRow, Instance,
};
pub use error::{DomainError, DomainResult};
pub use params::QueryParams;
pub use pipeline::{ListPipeline, PipelineConfig, RequestContext};
pub use principal::{AnonymousIdentity, Principal, DEFAULT_ANONYMOUS_USER};
pub use query::{Recognizer, Rewrite, ShortCircuiter};
pub use search::{
    MemorySearchIndex, SearchBackend, SearchConfig, SearchDocument, SearchError, SearchFilter,
    SearchIndexAdapter, SearchOutcome,
};
