//! Core data type definitions

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Role token granted by the auth backend.
///
/// The backend sends roles as opaque strings (`ROLE_ADMIN`, ...). The known
/// tokens get their own variants so the privileged set can be declared once;
/// anything else is carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Moderator,
    User,
    Other(String),
}

impl Role {
    pub const ADMIN_TOKEN: &'static str = "ROLE_ADMIN";
    pub const MODERATOR_TOKEN: &'static str = "ROLE_MODERATOR";
    pub const USER_TOKEN: &'static str = "ROLE_USER";

    /// The wire token for this role
    pub fn as_token(&self) -> &str {
        match self {
            Role::Admin => Self::ADMIN_TOKEN,
            Role::Moderator => Self::MODERATOR_TOKEN,
            Role::User => Self::USER_TOKEN,
            Role::Other(token) => token,
        }
    }
}

impl From<String> for Role {
    fn from(token: String) -> Self {
        match token.as_str() {
            Self::ADMIN_TOKEN => Role::Admin,
            Self::MODERATOR_TOKEN => Role::Moderator,
            Self::USER_TOKEN => Role::User,
            _ => Role::Other(token),
        }
    }
}

impl From<&str> for Role {
    fn from(token: &str) -> Self {
        Role::from(token.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(token) => token,
            known => known.as_token().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Authenticated user identity.
///
/// Serialized with the same camelCase shape the auth backend returns, which is
/// also what ends up in the `user` cookie and the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl User {
    pub fn new(id: u64, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            roles: BTreeSet::new(),
            avatar_url: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<Role>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_avatar(mut self, avatar_url: impl Into<String>) -> Self {
        self.avatar_url = Some(avatar_url.into());
        self
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    /// Apply a partial profile update, field by field
    pub fn merge(&mut self, update: ProfileUpdate) {
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(email) = update.email {
            self.email = email;
        }
        if let Some(roles) = update.roles {
            self.roles = roles;
        }
        if let Some(avatar_url) = update.avatar_url {
            self.avatar_url = avatar_url;
        }
    }
}

/// Partial identity used by profile updates
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<BTreeSet<Role>>,
    /// `Some(None)` clears the avatar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.roles.is_none()
            && self.avatar_url.is_none()
    }
}

impl From<User> for ProfileUpdate {
    fn from(user: User) -> Self {
        Self {
            username: Some(user.username),
            email: Some(user.email),
            roles: Some(user.roles),
            avatar_url: Some(user.avatar_url),
        }
    }
}

/// Opaque bearer credential returned alongside the identity at login.
///
/// Never consulted by the access policy. `Debug` is redacted so the token does
/// not leak into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken([REDACTED])")
    }
}

/// Identity plus the token it was issued with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: Option<SessionToken>,
}
