//! Request-level composition of the filters.

use std::sync::Arc;

use assetscope_storage::{Grant, ObjectId, QuerySet, Record, StorageError};
use tracing::{debug, instrument};

use crate::access::{
    AccessStore, AssignedPermissionFilter, ObjectPermissionsFilter, OwnerFilter,
    RelatedResourceFilter, ViewAction,
};
use crate::attachments::{Attachment, AttachmentGroupingEngine, AttachmentQuery, AttachmentView};
use crate::error::DomainResult;
use crate::params::QueryParams;
use crate::principal::{AnonymousIdentity, Principal};
use crate::search::{SearchBackend, SearchConfig, SearchFilter, SearchIndexAdapter};

/// Everything a single request contributes.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub principal: Principal,
    pub action: ViewAction,
    pub params: QueryParams,
}

impl RequestContext {
    pub fn list(principal: Principal, params: QueryParams) -> Self {
        Self {
            principal,
            action: ViewAction::List,
            params,
        }
    }

    pub fn retrieve(principal: Principal) -> Self {
        Self {
            principal,
            action: ViewAction::Retrieve,
            params: QueryParams::default(),
        }
    }
}

/// Settings shared by every request.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub anonymous: AnonymousIdentity,
    pub search: SearchConfig,
}

/// Access filter, then search filter, then materialization.
pub struct ListPipeline<S: AccessStore, B: SearchBackend> {
    store: Arc<S>,
    permissions: ObjectPermissionsFilter<S>,
    related: RelatedResourceFilter<S>,
    assigned: AssignedPermissionFilter,
    owner: OwnerFilter,
    search: SearchFilter<S, B>,
    attachments: AttachmentGroupingEngine,
}

impl<S: AccessStore, B: SearchBackend> ListPipeline<S, B> {
    pub fn new(store: Arc<S>, backend: Arc<B>, config: PipelineConfig) -> Self {
        let PipelineConfig { anonymous, search } = config;
        let permissions = ObjectPermissionsFilter::new(Arc::clone(&store), anonymous.clone());
        let adapter = Arc::new(SearchIndexAdapter::new(backend, search));
        Self {
            related: RelatedResourceFilter::new(Arc::clone(&store), permissions.clone()),
            assigned: AssignedPermissionFilter::new(anonymous.clone()),
            owner: OwnerFilter::new(anonymous.clone()),
            search: SearchFilter::new(Arc::clone(&store), adapter, anonymous),
            permissions,
            store,
            attachments: AttachmentGroupingEngine::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn search_adapter(&self) -> &Arc<SearchIndexAdapter<B>> {
        self.search.adapter()
    }

    /// Narrows `base` without reading it.
    pub async fn filter(&self, ctx: &RequestContext, base: &QuerySet) -> DomainResult<QuerySet> {
        let visible = self
            .permissions
            .visible(&ctx.principal, base, ctx.action, ctx.params.all_public)
            .await?;
        self.search.filter(&ctx.principal, &visible, &ctx.params).await
    }

    /// Filters and fetches `base`.
    #[instrument(skip_all, fields(content_type = %base.content_type(), user = %ctx.principal.id))]
    pub async fn run(&self, ctx: &RequestContext, base: &QuerySet) -> DomainResult<Vec<Record>> {
        let filtered = self.filter(ctx, base).await?;
        let records = self.store.fetch(&filtered).await?;
        debug!(count = records.len(), "list materialized");
        Ok(records)
    }

    /// Fetches one object if the principal may see it.
    pub async fn retrieve(
        &self,
        ctx: &RequestContext,
        content_type: &str,
        pk: &ObjectId,
    ) -> DomainResult<Record> {
        let base = QuerySet::all(content_type).pk_in([pk.clone()]);
        let visible = self
            .permissions
            .visible(&ctx.principal, &base, ctx.action, ctx.params.all_public)
            .await?;
        self.store
            .fetch(&visible)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                StorageError::RecordNotFound {
                    content_type: content_type.to_string(),
                    pk: pk.to_string(),
                }
                .into()
            })
    }

    /// Children whose parent the principal may see, then the search filter.
    pub async fn related(
        &self,
        ctx: &RequestContext,
        parent_type: &str,
        children: &QuerySet,
    ) -> DomainResult<Vec<Record>> {
        let visible = self
            .related
            .filter_children(
                &ctx.principal,
                parent_type,
                children,
                ctx.action,
                ctx.params.all_public,
            )
            .await?;
        let filtered = self.search.filter(&ctx.principal, &visible, &ctx.params).await?;
        Ok(self.store.fetch(&filtered).await?)
    }

    /// Nested records of resources the principal owns, reached through `path`.
    pub async fn owned(
        &self,
        ctx: &RequestContext,
        children: &QuerySet,
        path: &[&str],
    ) -> DomainResult<Vec<Record>> {
        let owned = self.owner.filter(&ctx.principal, children, path);
        Ok(self.store.fetch(&owned).await?)
    }

    /// Grant records the principal may see.
    pub async fn assigned_permissions(&self, principal: &Principal) -> DomainResult<Vec<Grant>> {
        let grants = self.store.grants().await?;
        Ok(self.assigned.filter(principal, grants))
    }

    /// Sorts and groups attachments per the request parameters.
    ///
    /// No access check happens here: `attachments` must already be limited
    /// to submissions the requester may see.
    pub fn attachments(
        &self,
        params: &QueryParams,
        attachments: Vec<Attachment>,
    ) -> AttachmentView {
        let query = AttachmentQuery::from_params(params);
        self.attachments.project(attachments, &query)
    }
}

#[cfg(test)]
mod tests;
