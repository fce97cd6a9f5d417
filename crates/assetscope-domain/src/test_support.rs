//! Shared fixtures for unit tests.
//!
//! Models a small form library: collections that can be made public and
//! discoverable, assets that live in collections, and hooks nested under
//! assets.

use std::sync::Arc;

use assetscope_storage::{
    Capability, FieldKind, FieldValue, MemoryRepository, Record, Schema, DISCOVERABLE_FIELD,
};

use crate::principal::DEFAULT_ANONYMOUS_USER;

pub(crate) fn library() -> Arc<MemoryRepository> {
    let repo = MemoryRepository::new_shared();
    repo.register_schema(
        Schema::new("kpi", "collection")
            .with_field("uid", FieldKind::Text)
            .with_field("owner", FieldKind::Text)
            .with_field(DISCOVERABLE_FIELD, FieldKind::Bool)
            .with_discoverability(Capability::OnSelf)
            .with_subscriptions(Capability::OnSelf),
    )
    .unwrap();
    repo.register_schema(
        Schema::new("kpi", "asset")
            .with_field("uid", FieldKind::Text)
            .with_field("owner", FieldKind::Text)
            .with_field("asset_type", FieldKind::Text)
            .with_reference("parent", "collection")
            .with_discoverability(Capability::OnParent)
            .with_subscriptions(Capability::OnParent),
    )
    .unwrap();
    repo.register_schema(
        Schema::new("kpi", "hook")
            .with_field("name", FieldKind::Text)
            .with_reference("asset", "asset"),
    )
    .unwrap();
    repo.register_schema(
        Schema::new("kpi", "hooklog")
            .with_field("status", FieldKind::Integer)
            .with_reference("hook", "hook"),
    )
    .unwrap();
    repo
}

pub(crate) fn add_collection(repo: &MemoryRepository, pk: i64, owner: &str, discoverable: bool) {
    repo.insert_record(
        "collection",
        Record::new(pk)
            .with("uid", format!("c{pk}"))
            .with("owner", owner)
            .with(DISCOVERABLE_FIELD, discoverable),
    )
    .unwrap();
    repo.grant(owner, "kpi.view_collection", "collection", pk);
}

pub(crate) fn add_asset(
    repo: &MemoryRepository,
    pk: i64,
    owner: &str,
    asset_type: &str,
    parent: Option<i64>,
) {
    let parent = parent.map_or(FieldValue::Null, FieldValue::from);
    repo.insert_record(
        "asset",
        Record::new(pk)
            .with("uid", format!("a{pk}"))
            .with("owner", owner)
            .with("asset_type", asset_type)
            .with("parent", parent),
    )
    .unwrap();
    repo.grant(owner, "kpi.view_asset", "asset", pk);
}

/// Grants view permission to `user`.
pub(crate) fn share(repo: &MemoryRepository, user: &str, content_type: &str, pk: i64) {
    repo.grant(user, &format!("kpi.view_{content_type}"), content_type, pk);
}

/// Grants view permission to the shared anonymous identity.
pub(crate) fn make_public(repo: &MemoryRepository, content_type: &str, pk: i64) {
    share(repo, DEFAULT_ANONYMOUS_USER, content_type, pk);
}
