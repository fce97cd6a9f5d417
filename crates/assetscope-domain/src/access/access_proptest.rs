//! Property-based tests for the visible-set computation.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use assetscope_storage::{MemoryRepository, ObjectId, QuerySet, ResourceRepository};
    use proptest::prelude::*;

    use crate::access::{ObjectPermissionsFilter, ViewAction};
    use crate::principal::{AnonymousIdentity, Principal};
    use crate::test_support::{add_collection, library, make_public, share};

    #[derive(Debug, Clone)]
    struct CollectionCase {
        owned_by_alice: bool,
        discoverable: bool,
        public: bool,
        shared_with_alice: bool,
        subscribed: bool,
    }

    fn collection_strategy() -> impl Strategy<Value = CollectionCase> {
        (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
            |(owned_by_alice, discoverable, public, shared_with_alice, subscribed)| CollectionCase {
                owned_by_alice,
                discoverable,
                public,
                shared_with_alice,
                subscribed,
            },
        )
    }

    fn build(collections: &[CollectionCase]) -> Arc<MemoryRepository> {
        let repo = library();
        for (i, collection) in collections.iter().enumerate() {
            let pk = i as i64 + 1;
            let owner = if collection.owned_by_alice { "alice" } else { "bob" };
            add_collection(&repo, pk, owner, collection.discoverable);
            if collection.public {
                make_public(&repo, "collection", pk);
            }
            if collection.shared_with_alice {
                share(&repo, "alice", "collection", pk);
            }
            if collection.subscribed {
                repo.subscribe("alice", "collection", pk);
            }
        }
        repo
    }

    fn visible(
        repo: &Arc<MemoryRepository>,
        principal: &Principal,
        action: ViewAction,
        all_public: bool,
    ) -> BTreeSet<ObjectId> {
        let filter = ObjectPermissionsFilter::new(Arc::clone(repo), AnonymousIdentity::default());
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        runtime.block_on(async {
            let qs = filter
                .visible(principal, &QuerySet::all("collection"), action, all_public)
                .await
                .unwrap();
            repo.pks(&qs).await.unwrap().into_iter().collect()
        })
    }

    const MODES: [(ViewAction, bool); 3] = [
        (ViewAction::List, false),
        (ViewAction::List, true),
        (ViewAction::Retrieve, false),
    ];

    proptest! {
        #[test]
        fn test_visible_set_never_exceeds_base(
            collections in prop::collection::vec(collection_strategy(), 0..8),
        ) {
            let repo = build(&collections);
            let all: BTreeSet<ObjectId> =
                (1..=collections.len() as i64).map(ObjectId::Int).collect();
            let principals =
                [Principal::user("alice"), Principal::anonymous(), Principal::superuser("root")];
            for principal in principals {
                for (action, all_public) in MODES {
                    let seen = visible(&repo, &principal, action, all_public);
                    prop_assert!(seen.is_subset(&all));
                }
            }
        }

        #[test]
        fn test_adding_a_grant_never_hides_objects(
            collections in prop::collection::vec(collection_strategy(), 1..8),
            target in any::<prop::sample::Index>(),
        ) {
            let repo = build(&collections);
            let alice = Principal::user("alice");
            let before: Vec<_> = MODES
                .iter()
                .map(|(action, all_public)| visible(&repo, &alice, *action, *all_public))
                .collect();

            let pk = target.index(collections.len()) as i64 + 1;
            share(&repo, "alice", "collection", pk);

            for ((action, all_public), earlier) in MODES.iter().zip(before) {
                let later = visible(&repo, &alice, *action, *all_public);
                prop_assert!(earlier.is_subset(&later));
                prop_assert!(later.contains(&ObjectId::Int(pk)));
            }
        }

        #[test]
        fn test_anonymous_list_is_exactly_the_public_branch(
            collections in prop::collection::vec(collection_strategy(), 0..8),
        ) {
            let repo = build(&collections);
            let discoverable: BTreeSet<ObjectId> = collections
                .iter()
                .enumerate()
                .filter(|(_, s)| s.public && s.discoverable)
                .map(|(i, _)| ObjectId::Int(i as i64 + 1))
                .collect();
            let anonymous = Principal::anonymous();
            prop_assert_eq!(visible(&repo, &anonymous, ViewAction::List, true), discoverable);
            // Subscriptions were recorded for alice only.
            prop_assert!(visible(&repo, &anonymous, ViewAction::List, false).is_empty());
        }
    }
}
