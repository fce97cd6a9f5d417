//! Filtering child records through the visibility of their parent resource.

use std::sync::Arc;

use assetscope_storage::{Predicate, QuerySet};

use super::{AccessStore, ObjectPermissionsFilter, ViewAction};
use crate::error::DomainResult;
use crate::principal::Principal;

/// Restricts child records to those whose parent resource is visible.
///
/// The child type must declare exactly one reference field to the parent
/// type; anything else is a structural error, not an empty result.
pub struct RelatedResourceFilter<S> {
    store: Arc<S>,
    permissions: ObjectPermissionsFilter<S>,
}

impl<S: AccessStore> RelatedResourceFilter<S> {
    pub fn new(store: Arc<S>, permissions: ObjectPermissionsFilter<S>) -> Self {
        Self { store, permissions }
    }

    pub async fn filter_children(
        &self,
        principal: &Principal,
        parent_type: &str,
        children: &QuerySet,
        action: ViewAction,
        all_public: bool,
    ) -> DomainResult<QuerySet> {
        let child_schema = self.store.schema(children.content_type()).await?;
        let reference = child_schema.reference_to(parent_type)?.name.clone();

        let visible_parents = self
            .permissions
            .visible(principal, &QuerySet::all(parent_type), action, all_public)
            .await?;

        Ok(children.filter(Predicate::related(
            reference,
            visible_parents.predicate().clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use assetscope_storage::{MemoryRepository, ObjectId, Record, ResourceRepository};

    use super::*;
    use crate::error::DomainError;
    use crate::principal::AnonymousIdentity;
    use crate::test_support::{add_asset, add_collection, library, share};

    fn related_filter(repo: &Arc<MemoryRepository>) -> RelatedResourceFilter<MemoryRepository> {
        let permissions =
            ObjectPermissionsFilter::new(Arc::clone(repo), AnonymousIdentity::default());
        RelatedResourceFilter::new(Arc::clone(repo), permissions)
    }

    // Test: Hooks are visible only through assets the principal can see
    #[tokio::test]
    async fn test_children_follow_parent_visibility() {
        let repo = library();
        add_collection(&repo, 1, "bob", false);
        add_asset(&repo, 10, "alice", "survey", None);
        add_asset(&repo, 11, "bob", "survey", None);
        add_asset(&repo, 12, "bob", "survey", None);
        share(&repo, "alice", "asset", 12);
        for (pk, asset) in [(1, 10), (2, 11), (3, 12)] {
            repo.insert_record(
                "hook",
                Record::new(pk).with("name", "h").with("asset", asset),
            )
            .unwrap();
        }

        let qs = related_filter(&repo)
            .filter_children(
                &Principal::user("alice"),
                "asset",
                &QuerySet::all("hook"),
                ViewAction::List,
                false,
            )
            .await
            .unwrap();
        assert_eq!(
            repo.pks(&qs).await.unwrap(),
            vec![ObjectId::Int(1), ObjectId::Int(3)]
        );
    }

    // Test: A child type without a reference to the parent type is a structural error
    #[tokio::test]
    async fn test_missing_parent_reference_is_structural_error() {
        let repo = library();
        let err = related_filter(&repo)
            .filter_children(
                &Principal::user("alice"),
                "asset",
                &QuerySet::all("hooklog"),
                ViewAction::List,
                false,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Storage(assetscope_storage::StorageError::StructuralPrecondition { .. })
        ));
    }
}
