//! Principals and the shared anonymous identity.

use serde::{Deserialize, Serialize};

/// Default identifier of the shared anonymous identity.
pub const DEFAULT_ANONYMOUS_USER: &str = "AnonymousUser";

/// The identity a request acts as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Identifier grants and subscriptions are recorded against.
    pub id: String,
    /// Name carried by search documents in their grantee lists.
    pub username: String,
    pub is_superuser: bool,
    pub is_anonymous: bool,
}

impl Principal {
    /// A regular authenticated user whose username equals its id.
    pub fn user(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            username: id.clone(),
            id,
            is_superuser: false,
            is_anonymous: false,
        }
    }

    /// An authenticated superuser.
    pub fn superuser(id: impl Into<String>) -> Self {
        Self {
            is_superuser: true,
            ..Self::user(id)
        }
    }

    /// An unauthenticated request.
    pub fn anonymous() -> Self {
        Self {
            id: String::new(),
            username: String::new(),
            is_superuser: false,
            is_anonymous: true,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }
}

/// The well-known identity used for every public-object check.
///
/// Injected into the filters that need it rather than looked up from
/// process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymousIdentity {
    id: String,
}

impl Default for AnonymousIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_ANONYMOUS_USER)
    }
}

impl AnonymousIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The shared identity as a principal.
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id.clone(),
            username: self.id.clone(),
            is_superuser: false,
            is_anonymous: true,
        }
    }

    /// True for unauthenticated principals and for the shared identity itself.
    pub fn is_anonymous(&self, principal: &Principal) -> bool {
        principal.is_anonymous || principal.id == self.id
    }

    /// Maps anonymous principals to the shared identity; others pass through.
    pub fn resolve(&self, principal: &Principal) -> Principal {
        if self.is_anonymous(principal) {
            self.principal()
        } else {
            principal.clone()
        }
    }
}
