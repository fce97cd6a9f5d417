//! Reconciles search matches with the access-controlled set.

use std::collections::BTreeSet;

use assetscope_storage::{ObjectId, QuerySet, StorageResult};

/// Intersects index identifiers with the primary keys of a queryset.
pub struct ResultSetIntersector;

impl ResultSetIntersector {
    /// Restricts `base` to the members of `access_pks` that the index also
    /// returned.
    ///
    /// Index identifiers are text; each is coerced to the native type of the
    /// first element of `access_pks`. A value that cannot be coerced is an
    /// error, never a silent drop.
    pub fn intersect(
        base: &QuerySet,
        access_pks: &[ObjectId],
        search_ids: &BTreeSet<String>,
    ) -> StorageResult<QuerySet> {
        let Some(sample) = access_pks.first() else {
            return Ok(base.none());
        };
        let found = search_ids
            .iter()
            .map(|raw| sample.coerce_like(raw))
            .collect::<StorageResult<BTreeSet<ObjectId>>>()?;
        let keep: Vec<ObjectId> = access_pks
            .iter()
            .filter(|pk| found.contains(pk))
            .cloned()
            .collect();
        Ok(base.pk_in(keep))
    }
}
