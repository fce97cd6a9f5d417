//! Object-level access control filters.
//!
//! Every filter narrows a lazy [`QuerySet`](assetscope_storage::QuerySet) (or,
//! for grant records, a list) to what a principal may see:
//!
//! - [`ObjectPermissionsFilter`]: ownership, explicit grants, public
//!   discoverability and subscriptions
//! - [`RelatedResourceFilter`]: children of visible parents
//! - [`AssignedPermissionFilter`]: grant records themselves
//! - [`OwnerFilter`]: nested records of resources the principal owns

mod assigned;
mod object_permissions;
mod owner;
mod related;
#[cfg(test)]
mod access_proptest;

use assetscope_storage::{GrantRepository, ResourceRepository, SubscriptionRepository};

pub use assigned::AssignedPermissionFilter;
pub use object_permissions::ObjectPermissionsFilter;
pub use owner::{OwnerFilter, OWNER_FIELD};
pub use related::RelatedResourceFilter;

/// Kind of request an access filter serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewAction {
    /// A collection listing; discoverability and subscriptions apply.
    List,
    /// Any single-object action.
    Retrieve,
}

impl ViewAction {
    pub fn is_list(self) -> bool {
        self == ViewAction::List
    }
}

/// Everything the access filters read.
pub trait AccessStore: ResourceRepository + GrantRepository + SubscriptionRepository {}

impl<T> AccessStore for T where T: ResourceRepository + GrantRepository + SubscriptionRepository {}
