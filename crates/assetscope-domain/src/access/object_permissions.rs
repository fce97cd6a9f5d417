//! Visible-set computation for a principal over one resource type.

use std::sync::Arc;

use assetscope_storage::{
    Capability, Predicate, QuerySet, Schema, StorageError, DISCOVERABLE_FIELD, PARENT_FIELD,
};
use tracing::{debug, instrument};

use super::{AccessStore, ViewAction};
use crate::error::DomainResult;
use crate::principal::{AnonymousIdentity, Principal};

/// Narrows a collection to the objects a principal may see.
///
/// Visibility is the union of two branches:
///
/// 1. **Owned or explicitly shared**: objects on which the principal holds
///    the type's view permission. Anonymous principals never get this branch.
/// 2. **Public**: objects on which the shared anonymous identity holds the
///    view permission. For list actions this branch is further narrowed to
///    discoverable objects and, unless `all_public` is requested, to those the
///    principal subscribed to.
///
/// Superusers bypass filtering for single-object actions only; their list
/// views go through the same pipeline as everyone else's so they are not
/// flooded with every object in the system.
pub struct ObjectPermissionsFilter<S> {
    store: Arc<S>,
    anonymous: AnonymousIdentity,
}

impl<S> Clone for ObjectPermissionsFilter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            anonymous: self.anonymous.clone(),
        }
    }
}

impl<S: AccessStore> ObjectPermissionsFilter<S> {
    pub fn new(store: Arc<S>, anonymous: AnonymousIdentity) -> Self {
        Self { store, anonymous }
    }

    /// Computes the visible subset of `base`.
    #[instrument(
        skip(self, principal, base),
        fields(principal = %principal.id, content_type = %base.content_type())
    )]
    pub async fn visible(
        &self,
        principal: &Principal,
        base: &QuerySet,
        action: ViewAction,
        all_public: bool,
    ) -> DomainResult<QuerySet> {
        if principal.is_superuser && !action.is_list() {
            return Ok(base.clone());
        }

        let content_type = base.content_type();
        let schema = self.store.schema(content_type).await?;
        let permission = schema.view_permission();
        let user = self.anonymous.resolve(principal);

        let owned_and_shared = if self.anonymous.is_anonymous(principal) {
            base.none()
        } else {
            base.pk_in(
                self.store
                    .objects_with_permission(&user.id, &permission, content_type)
                    .await?,
            )
        };
        let public = base.pk_in(
            self.store
                .objects_with_permission(self.anonymous.id(), &permission, content_type)
                .await?,
        );

        if !action.is_list() {
            return Ok(owned_and_shared.union(&public));
        }

        let discoverable = self.discoverable(&schema, &public).await?;
        if all_public {
            debug!("subscriptions ignored, returning all discoverable objects");
            return Ok(owned_and_shared.union(&discoverable));
        }

        let subscribed = self.subscribed(&schema, &discoverable, &user).await?;
        Ok(owned_and_shared.union(&subscribed))
    }

    /// Public objects flagged discoverable on themselves or on their parent.
    ///
    /// Delegation only counts when the parent type carries the flag itself;
    /// otherwise nothing is discoverable.
    async fn discoverable(&self, schema: &Schema, public: &QuerySet) -> DomainResult<QuerySet> {
        match schema.discoverability {
            Capability::OnSelf => Ok(public.filter(Predicate::eq(DISCOVERABLE_FIELD, true))),
            Capability::OnParent => {
                let Some(parent_type) = schema.parent_field().and_then(|f| f.target()) else {
                    return Ok(public.none());
                };
                let parent = match self.store.schema(parent_type).await {
                    Ok(parent) => parent,
                    Err(StorageError::SchemaNotFound { .. }) => return Ok(public.none()),
                    Err(e) => return Err(e.into()),
                };
                if parent.discoverability != Capability::OnSelf {
                    debug!(parent_type, "parent type is not discoverable");
                    return Ok(public.none());
                }
                Ok(public.filter(Predicate::related(
                    PARENT_FIELD,
                    Predicate::eq(DISCOVERABLE_FIELD, true),
                )))
            }
            Capability::Absent => Ok(public.none()),
        }
    }

    /// Discoverable objects the user subscribed to, directly or via their parent.
    async fn subscribed(
        &self,
        schema: &Schema,
        discoverable: &QuerySet,
        user: &Principal,
    ) -> DomainResult<QuerySet> {
        match schema.subscriptions {
            Capability::OnSelf => {
                let subscriptions = self
                    .store
                    .subscribed_objects(&user.id, &schema.content_type)
                    .await?;
                Ok(discoverable.pk_in(subscriptions))
            }
            Capability::OnParent => {
                let parent_type = schema
                    .parent_field()
                    .and_then(|f| f.target())
                    .ok_or_else(|| StorageError::StructuralPrecondition {
                        message: format!(
                            "content type '{}' delegates subscriptions to a missing parent",
                            schema.content_type
                        ),
                    })?;
                let subscriptions = self.store.subscribed_objects(&user.id, parent_type).await?;
                Ok(discoverable.filter(Predicate::related(
                    PARENT_FIELD,
                    Predicate::pk_in(subscriptions),
                )))
            }
            Capability::Absent => Ok(discoverable.none()),
        }
    }
}
