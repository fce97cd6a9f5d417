//! Tests for the request pipeline.
//!
//! Organized by functionality:
//! - Short-circuited queries
//! - Full-text search and fallback
//! - Search failure modes
//! - Lazy index setup
//! - Superuser and anonymous visibility
//! - Related, owner and assigned-permission views
//! - Attachment projection

mod mocks;
