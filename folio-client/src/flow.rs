//! Auth flows that combine backend calls with session mutations.
//!
//! The session context is only touched after the backend has accepted the
//! request, so a failed sign-in or profile save never leaves a half-logged-in
//! state behind.

use crate::client::{AuthClient, ClientError, ClientResult, SignInRequest, SignUpRequest};
use crate::context::SessionContext;
use folio_core::{ProfileUpdate, User};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct AuthFlow<'a> {
    client: &'a AuthClient,
    context: &'a SessionContext,
}

impl<'a> AuthFlow<'a> {
    pub fn new(client: &'a AuthClient, context: &'a SessionContext) -> Self {
        Self { client, context }
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> ClientResult<User> {
        let request = SignInRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let (user, token) = self.client.sign_in(&request).await?.into_session();

        // The session is live in memory even when it could not be persisted
        if let Err(e) = self.context.login(user.clone(), token) {
            warn!("Signed in {} without persisting the session: {}", user.username, e);
        }
        Ok(user)
    }

    /// Register, then sign in with the same credentials
    pub async fn sign_up(&self, request: SignUpRequest) -> ClientResult<User> {
        self.client.sign_up(&request).await?;
        info!("Registered {}", request.username);
        self.sign_in(&request.username, &request.password).await
    }

    /// Save profile changes on the backend, then merge the accepted identity
    /// into the session
    pub async fn save_profile(&self, update: ProfileUpdate) -> ClientResult<User> {
        if self.context.current().is_none() {
            warn!("Profile save without an active session");
            return Err(ClientError::NoActiveSession);
        }
        let token = self.context.token().ok_or(ClientError::NoActiveSession)?;

        let accepted = self.client.update_profile(&token, &update).await?;
        match self.context.update_profile(ProfileUpdate::from(accepted)) {
            Err(ClientError::Storage(e)) => {
                warn!("Profile saved without persisting the session: {}", e);
                self.context.current().ok_or(ClientError::NoActiveSession)
            }
            result => result,
        }
    }
}
