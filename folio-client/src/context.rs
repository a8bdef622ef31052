//! Session context
//!
//! The single in-memory holder of the current identity. UI code reads the
//! identity and capability from here and mutates the session only through
//! `login`, `update_profile` and `logout`; nothing else touches the
//! [`SessionStore`] directly.

use crate::client::{ClientError, ClientResult};
use crate::navigation::Navigator;
use crate::store::SessionStore;
use folio_core::{AccessPolicy, Capability, FolioResult, ProfileUpdate, SessionToken, User};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Application-scoped session holder.
///
/// Construct once at startup and share it (usually behind an `Arc`). The
/// identity starts out empty and is only filled in by [`SessionContext::initialize`],
/// so consumers must treat the pre-initialization state as logged out.
pub struct SessionContext {
    store: SessionStore,
    policy: AccessPolicy,
    navigator: Arc<dyn Navigator>,
    waiting_path: String,
    identity: watch::Sender<Option<User>>,
    token: RwLock<Option<SessionToken>>,
    initialized: AtomicBool,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("store", &self.store)
            .field("policy", &self.policy)
            .field("user", &*self.identity.borrow())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl SessionContext {
    pub fn new(
        store: SessionStore,
        policy: AccessPolicy,
        navigator: Arc<dyn Navigator>,
        waiting_path: impl Into<String>,
    ) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            store,
            policy,
            navigator,
            waiting_path: waiting_path.into(),
            identity,
            token: RwLock::new(None),
            initialized: AtomicBool::new(false),
        }
    }

    /// Load the persisted session. Returns the identity now in memory.
    pub fn initialize(&self) -> Option<User> {
        let session = self.store.read_session();
        let (user, token) = match session {
            Some(session) => (Some(session.user), session.token),
            None => (None, None),
        };

        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
        self.identity.send_replace(user.clone());
        self.initialized.store(true, Ordering::Release);

        debug!(
            "Session context initialized ({})",
            if user.is_some() { "logged in" } else { "anonymous" }
        );
        user
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Current identity, `None` when logged out or not yet initialized
    pub fn current(&self) -> Option<User> {
        self.identity.borrow().clone()
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Watch identity changes
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.identity.subscribe()
    }

    /// Derived from the current identity on every call
    pub fn capability(&self) -> Capability {
        self.policy.capability(self.identity.borrow().as_ref())
    }

    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    /// Start a session. The in-memory identity is set even if persisting fails.
    pub fn login(&self, user: User, token: SessionToken) -> FolioResult<()> {
        info!("User {} logged in", user.username);
        let result = self.store.write(&user, &token);

        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        self.identity.send_replace(Some(user));

        if let Err(e) = &result {
            e.log();
        }
        result
    }

    /// Merge `update` into the current identity and persist it with the
    /// previously stored token. Like `login`, the in-memory identity is
    /// updated even if persisting fails; the storage error is returned.
    pub fn update_profile(&self, update: ProfileUpdate) -> ClientResult<User> {
        let Some(mut user) = self.current() else {
            warn!("Profile update without an active session");
            return Err(ClientError::NoActiveSession);
        };

        let token = self
            .token()
            .or_else(|| self.store.read_session().and_then(|s| s.token))
            .ok_or_else(|| {
                warn!("Profile update for {} but no token is stored", user.username);
                ClientError::NoActiveSession
            })?;

        user.merge(update);
        let result = self.store.write(&user, &token);

        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        self.identity.send_replace(Some(user.clone()));
        debug!("Profile updated for {}", user.username);

        if let Err(e) = result {
            e.log();
            return Err(ClientError::Storage(e));
        }
        Ok(user)
    }

    /// End the session: forget the identity, clear both backends, then move
    /// to the waiting page. Storage is cleared before navigating so the next
    /// request cannot carry stale credentials.
    pub fn logout(&self) {
        let previous = self.identity.send_replace(None);
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;

        if let Err(e) = self.store.clear() {
            e.log();
        }

        if let Some(user) = previous {
            info!("User {} logged out", user.username);
        }
        self.navigator.navigate(&self.waiting_path);
    }
}
