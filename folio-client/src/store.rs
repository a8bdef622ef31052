//! Session store
//!
//! Mirrors the identity and token into both storage backends and reconciles
//! them when they disagree. Reconciliation is one-directional and happens at
//! read time: the durable store fills gaps in the cookie store, never the
//! other way round, and a readable cookie value is never overwritten.

use crate::backend::StorageBackend;
use folio_core::{FolioResult, Session, SessionConfig, SessionToken, User};
use std::sync::Arc;
use tracing::{debug, warn};

/// Names under which the session is stored in each backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    pub token_key: String,
    pub user_key: String,
    pub token_cookie: String,
    pub user_cookie: String,
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionKeys {
    fn from(config: &SessionConfig) -> Self {
        Self {
            token_key: config.token_key.clone(),
            user_key: config.user_key.clone(),
            token_cookie: config.token_cookie.clone(),
            user_cookie: config.user_cookie.clone(),
        }
    }
}

/// Durable identity storage across the key-value and cookie backends
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn StorageBackend>,
    cookies: Arc<dyn StorageBackend>,
    keys: SessionKeys,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("kv", &self.kv.name())
            .field("cookies", &self.cookies.name())
            .field("keys", &self.keys)
            .finish()
    }
}

fn parse_user(raw: &str, backend: &str) -> Option<User> {
    match serde_json::from_str(raw) {
        Ok(user) => Some(user),
        Err(e) => {
            warn!("Ignoring malformed user data in {} store: {}", backend, e);
            None
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl SessionStore {
    pub fn new(
        kv: Arc<dyn StorageBackend>,
        cookies: Arc<dyn StorageBackend>,
        keys: SessionKeys,
    ) -> Self {
        Self { kv, cookies, keys }
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Write identity and token to both backends.
    ///
    /// Every write is attempted even if an earlier one fails; the first error
    /// is returned. There is no rollback, the last writer wins.
    pub fn write(&self, user: &User, token: &SessionToken) -> FolioResult<()> {
        let user_json = serde_json::to_string(user)?;

        let results = [
            self.kv.set(&self.keys.token_key, token.as_str()),
            self.kv.set(&self.keys.user_key, &user_json),
            self.cookies.set(&self.keys.token_cookie, token.as_str()),
            self.cookies.set(&self.keys.user_cookie, &user_json),
        ];

        debug!("Session written for user {}", user.id);
        results.into_iter().collect()
    }

    /// Current identity, if either backend holds a readable one
    pub fn read(&self) -> Option<User> {
        self.read_session().map(|session| session.user)
    }

    /// Current identity plus its token.
    ///
    /// The cookie backend wins when it holds a readable identity. Otherwise
    /// the durable store is consulted and whatever it has that the cookie
    /// backend lacks (unreadable counts as lacking) is copied over.
    pub fn read_session(&self) -> Option<Session> {
        let cookie_user = non_empty(self.cookies.get(&self.keys.user_cookie))
            .and_then(|raw| parse_user(&raw, self.cookies.name()));
        let cookie_token = non_empty(self.cookies.get(&self.keys.token_cookie));

        if let Some(user) = cookie_user {
            let token = cookie_token
                .or_else(|| self.backfill_token())
                .map(SessionToken::new);
            return Some(Session { user, token });
        }

        let kv_raw = non_empty(self.kv.get(&self.keys.user_key))?;
        let user = parse_user(&kv_raw, self.kv.name())?;

        debug!("Back-filling {} cookie from {} store", self.keys.user_cookie, self.kv.name());
        if let Err(e) = self.cookies.set(&self.keys.user_cookie, &kv_raw) {
            warn!("Failed to back-fill user cookie: {}", e);
        }

        let token = cookie_token
            .or_else(|| self.backfill_token())
            .map(SessionToken::new);

        Some(Session { user, token })
    }

    /// Copy the durable token into the cookie backend, if there is one
    fn backfill_token(&self) -> Option<String> {
        let token = non_empty(self.kv.get(&self.keys.token_key))?;
        debug!("Back-filling {} cookie from {} store", self.keys.token_cookie, self.kv.name());
        if let Err(e) = self.cookies.set(&self.keys.token_cookie, &token) {
            warn!("Failed to back-fill token cookie: {}", e);
        }
        Some(token)
    }

    /// Delete identity and token from both backends, present or not
    pub fn clear(&self) -> FolioResult<()> {
        let results = [
            self.kv.remove(&self.keys.user_key),
            self.kv.remove(&self.keys.token_key),
            self.cookies.remove(&self.keys.user_cookie),
            self.cookies.remove(&self.keys.token_cookie),
        ];

        debug!("Session cleared from {} and {}", self.kv.name(), self.cookies.name());
        results.into_iter().collect()
    }
}
