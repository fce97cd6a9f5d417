//! Short-circuiting of common search expressions.
//!
//! A handful of query strings are so common (and, for the structured
//! library-collection shape, so poorly served by the full-text index) that
//! they are answered with direct predicates instead. Recognizers are tried
//! in order; the first one that does not miss wins.

mod recognizers;

use assetscope_storage::Predicate;

pub use recognizers::{ExactQueryTable, LibraryCollectionPattern, ASSET_TYPE_FIELD};

/// Outcome of matching a query string against a recognizer.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    /// The query is one of the fixed, well-known strings.
    Exact(Predicate),
    /// The query has a recognized structure.
    Structured(Predicate),
    /// Not recognized; defer to the search index.
    Miss,
}

impl Rewrite {
    /// The rewritten predicate, if the query was recognized.
    pub fn predicate(&self) -> Option<&Predicate> {
        match self {
            Rewrite::Exact(p) | Rewrite::Structured(p) => Some(p),
            Rewrite::Miss => None,
        }
    }

    pub fn is_miss(&self) -> bool {
        matches!(self, Rewrite::Miss)
    }
}

/// Maps a query string to a direct predicate.
///
/// Implementations must be pure: the same input always yields the same rewrite.
pub trait Recognizer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn recognize(&self, query: &str) -> Rewrite;
}

/// Ordered list of recognizers.
pub struct ShortCircuiter {
    recognizers: Vec<Box<dyn Recognizer>>,
}

impl Default for ShortCircuiter {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExactQueryTable::default()),
            Box::new(LibraryCollectionPattern),
        ])
    }
}

impl ShortCircuiter {
    pub fn new(recognizers: Vec<Box<dyn Recognizer>>) -> Self {
        Self { recognizers }
    }

    /// Rewrites the query with the first recognizer that matches.
    pub fn rewrite(&self, query: &str) -> Rewrite {
        for recognizer in &self.recognizers {
            let rewrite = recognizer.recognize(query);
            if !rewrite.is_miss() {
                tracing::debug!(recognizer = recognizer.name(), query, "query short-circuited");
                return rewrite;
            }
        }
        Rewrite::Miss
    }
}
