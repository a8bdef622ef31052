//! Access policy shared by the route gate and the content access wrapper
//!
//! Both enforcement points call into this module so the allow/deny rule and the
//! privileged role set are declared exactly once.

use crate::types::{Role, User};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Roles whose holders may view restricted content
pub const PRIVILEGED_ROLES: &[Role] = &[Role::Admin, Role::Moderator];

/// Per-resource access requirement, fixed at authoring time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessRequirement {
    #[default]
    Open,
    Restricted,
}

impl AccessRequirement {
    pub fn is_restricted(self) -> bool {
        matches!(self, AccessRequirement::Restricted)
    }
}

impl From<bool> for AccessRequirement {
    fn from(need_access: bool) -> Self {
        if need_access {
            AccessRequirement::Restricted
        } else {
            AccessRequirement::Open
        }
    }
}

/// Whether the current caller may view restricted content.
///
/// Only obtainable through [`capability`] or [`AccessPolicy::capability`], so it
/// is always derived from an identity (or the explicit override) and never set
/// on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability(bool);

impl Capability {
    pub fn is_granted(self) -> bool {
        self.0
    }
}

/// Capability rule: an identity is present and holds a privileged role
pub fn capability(user: Option<&User>) -> Capability {
    Capability(user.is_some_and(|u| PRIVILEGED_ROLES.iter().any(|role| u.has_role(role))))
}

/// Allow/deny rule. Open resources are always allowed.
pub fn allow(requirement: AccessRequirement, capability: Capability) -> bool {
    match requirement {
        AccessRequirement::Restricted => capability.is_granted(),
        AccessRequirement::Open => true,
    }
}

/// Capability derivation with the deployment override applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    grant_all_access: bool,
}

impl AccessPolicy {
    /// The normal role-derived policy
    pub fn role_based() -> Self {
        Self::default()
    }

    /// `grant_all_access` turns every caller, anonymous ones included, into a
    /// privileged one. Meant for development and staging only.
    pub fn new(grant_all_access: bool) -> Self {
        if grant_all_access {
            warn!("grant_all_access is enabled: restricted content is served to everyone");
        }
        Self { grant_all_access }
    }

    pub fn grants_all_access(&self) -> bool {
        self.grant_all_access
    }

    pub fn capability(&self, user: Option<&User>) -> Capability {
        if self.grant_all_access {
            Capability(true)
        } else {
            capability(user)
        }
    }

    pub fn allows(&self, requirement: AccessRequirement, user: Option<&User>) -> bool {
        allow(requirement, self.capability(user))
    }
}
