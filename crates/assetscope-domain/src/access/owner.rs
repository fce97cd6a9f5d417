//! Ownership filter for records nested under a resource.

use assetscope_storage::{Predicate, QuerySet};

use crate::principal::{AnonymousIdentity, Principal};

/// Field naming the owning user of a resource.
pub const OWNER_FIELD: &str = "owner";

/// Restricts nested records to those whose ancestor resource is owned by
/// the principal.
///
/// `path` lists the reference fields leading from the nested record to the
/// owning resource, e.g. `["asset"]` for hooks or `["hook", "asset"]` for
/// hook logs.
#[derive(Debug, Clone, Default)]
pub struct OwnerFilter {
    anonymous: AnonymousIdentity,
}

impl OwnerFilter {
    pub fn new(anonymous: AnonymousIdentity) -> Self {
        Self { anonymous }
    }

    pub fn filter(&self, principal: &Principal, children: &QuerySet, path: &[&str]) -> QuerySet {
        if self.anonymous.is_anonymous(principal) {
            return children.none();
        }
        let owned = path
            .iter()
            .rev()
            .fold(Predicate::eq(OWNER_FIELD, principal.id.as_str()), |inner, field| {
                Predicate::related(*field, inner)
            });
        children.filter(owned)
    }
}

#[cfg(test)]
mod tests {
    use assetscope_storage::{ObjectId, Record, ResourceRepository};

    use super::*;
    use crate::test_support::{add_asset, library};

    // Test: Two-level nesting resolves the owner through every hop
    #[tokio::test]
    async fn test_hook_logs_follow_hook_then_asset() {
        let repo = library();
        add_asset(&repo, 10, "alice", "survey", None);
        add_asset(&repo, 11, "bob", "survey", None);
        repo.insert_record("hook", Record::new(1).with("asset", 10)).unwrap();
        repo.insert_record("hook", Record::new(2).with("asset", 11)).unwrap();
        repo.insert_record("hooklog", Record::new(100).with("hook", 1)).unwrap();
        repo.insert_record("hooklog", Record::new(101).with("hook", 2)).unwrap();

        let filter = OwnerFilter::default();
        let alice = Principal::user("alice");

        let hooks = filter.filter(&alice, &QuerySet::all("hook"), &["asset"]);
        assert_eq!(repo.pks(&hooks).await.unwrap(), vec![ObjectId::Int(1)]);

        let logs = filter.filter(&alice, &QuerySet::all("hooklog"), &["hook", "asset"]);
        assert_eq!(repo.pks(&logs).await.unwrap(), vec![ObjectId::Int(100)]);

        let anonymous = filter.filter(&Principal::anonymous(), &QuerySet::all("hook"), &["asset"]);
        assert!(anonymous.is_none());
    }
}
