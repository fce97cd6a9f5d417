//! Repository trait definitions.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::StorageResult;
use crate::predicate::QuerySet;
use crate::record::{Grant, ObjectId, Record, Schema};

/// Typed collections of resources, queried by predicate.
///
/// Implementations must be thread-safe (Send + Sync). Evaluating a
/// predicate that names a field the content type does not declare must
/// fail with `StorageError::UnknownField`.
#[async_trait]
pub trait ResourceRepository: Send + Sync + 'static {
    /// Gets the schema of a content type.
    async fn schema(&self, content_type: &str) -> StorageResult<Arc<Schema>>;

    /// Checks the query against its schema without reading records.
    async fn validate(&self, query: &QuerySet) -> StorageResult<()>;

    /// Returns the matching records ordered by primary key.
    async fn fetch(&self, query: &QuerySet) -> StorageResult<Vec<Record>>;

    /// Returns the primary keys of the matching records, ordered.
    async fn pks(&self, query: &QuerySet) -> StorageResult<Vec<ObjectId>> {
        Ok(self
            .fetch(query)
            .await?
            .into_iter()
            .map(|record| record.pk)
            .collect())
    }

    /// Gets one record.
    async fn get(&self, content_type: &str, pk: &ObjectId) -> StorageResult<Record>;
}

/// Read access to explicit permission assignments.
#[async_trait]
pub trait GrantRepository: Send + Sync + 'static {
    /// All objects of a content type on which `user` holds `permission`.
    async fn objects_with_permission(
        &self,
        user: &str,
        permission: &str,
        content_type: &str,
    ) -> StorageResult<BTreeSet<ObjectId>>;

    /// Whether `user` holds `permission` on one object.
    async fn has_permission(
        &self,
        user: &str,
        permission: &str,
        content_type: &str,
        pk: &ObjectId,
    ) -> StorageResult<bool> {
        Ok(self
            .objects_with_permission(user, permission, content_type)
            .await?
            .contains(pk))
    }

    /// Every grant record, ordered by id.
    async fn grants(&self) -> StorageResult<Vec<Grant>>;
}

/// Read access to collection subscriptions.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync + 'static {
    /// Objects of a content type to which `user` has subscribed.
    async fn subscribed_objects(
        &self,
        user: &str,
        content_type: &str,
    ) -> StorageResult<BTreeSet<ObjectId>>;
}
