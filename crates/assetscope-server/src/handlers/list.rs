//! List, retrieve and report handlers.

use std::collections::HashMap;
use std::sync::Arc;

use assetscope_domain::search::SearchBackend;
use assetscope_domain::{
    AccessStore, Attachment, AttachmentView, DomainError, DomainResult, ListPipeline, Principal,
    QueryParams, RequestContext,
};
use assetscope_storage::{Grant, ObjectId, QuerySet, Record};
use tracing::{error, info, instrument};

use crate::config::{ConfigLoadError, ServerConfig};

/// Raw query string parameters as received.
pub type RawParams = HashMap<String, String>;

/// Entry point for collection reads.
///
/// Parses request parameters, runs the pipeline and logs failures by
/// audience: input errors at info, everything else at error.
pub struct ListHandler<S, B>
where
    S: AccessStore,
    B: SearchBackend,
{
    pipeline: Arc<ListPipeline<S, B>>,
}

impl<S, B> Clone for ListHandler<S, B>
where
    S: AccessStore,
    B: SearchBackend,
{
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

impl<S, B> ListHandler<S, B>
where
    S: AccessStore,
    B: SearchBackend,
{
    pub fn new(pipeline: Arc<ListPipeline<S, B>>) -> Self {
        Self { pipeline }
    }

    /// Builds the pipeline from validated configuration.
    pub fn from_config(
        config: &ServerConfig,
        store: Arc<S>,
        backend: Arc<B>,
    ) -> Result<Self, ConfigLoadError> {
        config.validate()?;
        if backend.name() != config.search.backend {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "search.backend is '{}' but the provided backend is '{}'",
                    config.search.backend,
                    backend.name()
                ),
            });
        }
        let pipeline = ListPipeline::new(store, backend, config.pipeline_config());
        Ok(Self::new(Arc::new(pipeline)))
    }

    pub fn pipeline(&self) -> &Arc<ListPipeline<S, B>> {
        &self.pipeline
    }

    /// Lists visible objects of a content type.
    #[instrument(skip(self, principal, params), fields(user = %principal.id))]
    pub async fn list(
        &self,
        principal: Principal,
        content_type: &str,
        params: &RawParams,
    ) -> DomainResult<Vec<Record>> {
        let result: DomainResult<Vec<Record>> = async {
            let ctx = RequestContext::list(principal, QueryParams::from_map(params)?);
            self.pipeline.run(&ctx, &QuerySet::all(content_type)).await
        }
        .await;
        report("list", result)
    }

    /// Fetches one visible object.
    #[instrument(skip(self, principal), fields(user = %principal.id))]
    pub async fn retrieve(
        &self,
        principal: Principal,
        content_type: &str,
        pk: &ObjectId,
    ) -> DomainResult<Record> {
        let ctx = RequestContext::retrieve(principal);
        report("retrieve", self.pipeline.retrieve(&ctx, content_type, pk).await)
    }

    /// Lists children whose parent is visible.
    #[instrument(skip(self, principal, params), fields(user = %principal.id))]
    pub async fn related(
        &self,
        principal: Principal,
        parent_type: &str,
        child_type: &str,
        params: &RawParams,
    ) -> DomainResult<Vec<Record>> {
        let result: DomainResult<Vec<Record>> = async {
            let ctx = RequestContext::list(principal, QueryParams::from_map(params)?);
            self.pipeline
                .related(&ctx, parent_type, &QuerySet::all(child_type))
                .await
        }
        .await;
        report("related", result)
    }

    /// Lists nested records of resources the principal owns.
    #[instrument(skip(self, principal), fields(user = %principal.id))]
    pub async fn owned(
        &self,
        principal: Principal,
        child_type: &str,
        path: &[&str],
    ) -> DomainResult<Vec<Record>> {
        let ctx = RequestContext::list(principal, QueryParams::default());
        report(
            "owned",
            self.pipeline
                .owned(&ctx, &QuerySet::all(child_type), path)
                .await,
        )
    }

    /// Lists the grant records the principal may see.
    #[instrument(skip(self, principal), fields(user = %principal.id))]
    pub async fn assigned_permissions(&self, principal: Principal) -> DomainResult<Vec<Grant>> {
        report(
            "assigned_permissions",
            self.pipeline.assigned_permissions(&principal).await,
        )
    }

    /// Sorts and groups attachments for a report.
    ///
    /// Callers pass attachments already limited to submissions the requester
    /// may see; no access check happens here.
    pub fn attachments(
        &self,
        attachments: Vec<Attachment>,
        params: &RawParams,
    ) -> DomainResult<AttachmentView> {
        let result = QueryParams::from_map(params)
            .map(|params| self.pipeline.attachments(&params, attachments));
        report("attachments", result)
    }
}

fn report<T>(operation: &'static str, result: DomainResult<T>) -> DomainResult<T> {
    if let Err(e) = &result {
        log_failure(operation, e);
    }
    result
}

fn log_failure(operation: &'static str, e: &DomainError) {
    if e.is_user_facing() {
        info!(operation, error = %e, "request rejected");
    } else {
        error!(operation, error = %e, "request failed");
    }
}
