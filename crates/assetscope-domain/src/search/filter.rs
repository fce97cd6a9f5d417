//! Free-text filtering of an access-controlled queryset.

use std::sync::Arc;

use assetscope_storage::{Predicate, QuerySet, ResourceRepository, PARENT_FIELD};
use tracing::{debug, instrument};

use super::adapter::{SearchIndexAdapter, SearchOutcome};
use super::backend::SearchBackend;
use super::intersect::ResultSetIntersector;
use crate::error::DomainResult;
use crate::params::QueryParams;
use crate::principal::{AnonymousIdentity, Principal};
use crate::query::ShortCircuiter;

/// Applies `parent` and `q` to a queryset that has already been narrowed to
/// what the principal may see.
pub struct SearchFilter<S, B: SearchBackend> {
    store: Arc<S>,
    short_circuiter: ShortCircuiter,
    adapter: Arc<SearchIndexAdapter<B>>,
    anonymous: AnonymousIdentity,
}

impl<S, B> SearchFilter<S, B>
where
    S: ResourceRepository,
    B: SearchBackend,
{
    pub fn new(
        store: Arc<S>,
        adapter: Arc<SearchIndexAdapter<B>>,
        anonymous: AnonymousIdentity,
    ) -> Self {
        Self {
            store,
            short_circuiter: ShortCircuiter::default(),
            adapter,
            anonymous,
        }
    }

    /// Replaces the default recognizers.
    pub fn with_short_circuiter(mut self, short_circuiter: ShortCircuiter) -> Self {
        self.short_circuiter = short_circuiter;
        self
    }

    pub fn adapter(&self) -> &Arc<SearchIndexAdapter<B>> {
        &self.adapter
    }

    #[instrument(skip_all, fields(content_type = %queryset.content_type(), user = %principal.id))]
    pub async fn filter(
        &self,
        principal: &Principal,
        queryset: &QuerySet,
        params: &QueryParams,
    ) -> DomainResult<QuerySet> {
        let queryset = if params.parentless_only() {
            queryset.filter(Predicate::is_null(PARENT_FIELD))
        } else {
            queryset.clone()
        };

        let Some(q) = params.q.as_deref() else {
            return Ok(queryset);
        };

        if let Some(predicate) = self.short_circuiter.rewrite(q).predicate() {
            // Checked alone so that a bad `parent` filter still errors later.
            let rewritten = QuerySet::all(queryset.content_type()).filter(predicate.clone());
            return match self.store.validate(&rewritten).await {
                Ok(()) => Ok(queryset.filter(predicate.clone())),
                Err(e) if e.is_unknown_field() => {
                    debug!(error = %e, "short-circuited query does not fit this type");
                    Ok(queryset.none())
                }
                Err(e) => Err(e.into()),
            };
        }

        let access_pks = self.store.pks(&queryset).await?;
        if access_pks.is_empty() {
            return Ok(queryset);
        }

        let principal = self.anonymous.resolve(principal);
        match self
            .adapter
            .search(q, queryset.content_type(), &principal)
            .await?
        {
            SearchOutcome::IndexNotPopulated => Ok(queryset),
            SearchOutcome::Matches(ids) => Ok(ResultSetIntersector::intersect(
                &queryset,
                &access_pks,
                &ids,
            )?),
        }
    }
}
