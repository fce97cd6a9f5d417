//! Visibility of permission grant records.

use std::collections::{HashMap, HashSet};

use assetscope_storage::{Grant, ObjectId};

use crate::principal::{AnonymousIdentity, Principal};

/// Decides which grant records a principal may see.
///
/// - Superusers see every grant.
/// - The anonymous identity sees only grants addressed to itself, so grants
///   held by real users stay hidden.
/// - Anyone else sees the grants on objects they hold a grant on themselves.
///
/// Object ids are only unique within a content type, so the match is done
/// per content type partition.
#[derive(Debug, Clone, Default)]
pub struct AssignedPermissionFilter {
    anonymous: AnonymousIdentity,
}

impl AssignedPermissionFilter {
    pub fn new(anonymous: AnonymousIdentity) -> Self {
        Self { anonymous }
    }

    pub fn filter(&self, principal: &Principal, grants: Vec<Grant>) -> Vec<Grant> {
        let user = self.anonymous.resolve(principal);
        if user.is_superuser {
            return grants;
        }
        if user.id == self.anonymous.id() {
            return grants.into_iter().filter(|g| g.user == user.id).collect();
        }

        let mut reachable: HashMap<String, HashSet<ObjectId>> = HashMap::new();
        for grant in grants.iter().filter(|g| g.user == user.id) {
            reachable
                .entry(grant.content_type.clone())
                .or_default()
                .insert(grant.object_id.clone());
        }

        grants
            .into_iter()
            .filter(|g| {
                reachable
                    .get(&g.content_type)
                    .is_some_and(|ids| ids.contains(&g.object_id))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::DEFAULT_ANONYMOUS_USER;

    fn grant(id: i64, content_type: &str, object_id: i64, user: &str) -> Grant {
        Grant {
            id,
            content_type: content_type.to_string(),
            object_id: ObjectId::Int(object_id),
            user: user.to_string(),
            permission: format!("kpi.view_{content_type}"),
        }
    }

    fn ids(grants: &[Grant]) -> Vec<i64> {
        grants.iter().map(|g| g.id).collect()
    }

    fn fixture() -> Vec<Grant> {
        vec![
            grant(1, "asset", 1, "alice"),
            grant(2, "asset", 1, "bob"),
            grant(3, "asset", 2, "bob"),
            // Same object id, different content type: must not leak asset grants.
            grant(4, "collection", 2, "alice"),
            grant(5, "collection", 2, "carol"),
            grant(6, "asset", 2, DEFAULT_ANONYMOUS_USER),
        ]
    }

    #[test]
    fn test_superuser_sees_all_grants() {
        let filter = AssignedPermissionFilter::default();
        let result = filter.filter(&Principal::superuser("root"), fixture());
        assert_eq!(ids(&result), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_anonymous_sees_only_its_own_grants() {
        let filter = AssignedPermissionFilter::default();
        let result = filter.filter(&Principal::anonymous(), fixture());
        assert_eq!(ids(&result), vec![6]);
    }

    #[test]
    fn test_user_sees_grants_on_objects_they_can_reach() {
        let filter = AssignedPermissionFilter::default();
        let result = filter.filter(&Principal::user("alice"), fixture());
        assert_eq!(ids(&result), vec![1, 2, 4, 5]);
    }

    #[test]
    fn test_user_without_grants_sees_nothing() {
        let filter = AssignedPermissionFilter::default();
        assert!(filter.filter(&Principal::user("dave"), fixture()).is_empty());
    }
}
