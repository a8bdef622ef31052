//! HTTP client for the user/auth backend

use folio_core::{FolioError, ProfileUpdate, Role, SessionToken, User};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, warn};
use url::Url;

/// Auth backend operation, used to pick a fallback user message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    SignIn,
    SignUp,
    UpdateProfile,
    ForgotPassword,
    ResetPassword,
}

impl AuthOperation {
    fn path(self) -> &'static str {
        match self {
            AuthOperation::SignIn => "api/auth/signin",
            AuthOperation::SignUp => "api/auth/signup",
            AuthOperation::UpdateProfile => "api/user/profile",
            AuthOperation::ForgotPassword => "api/auth/forgot-password",
            AuthOperation::ResetPassword => "api/auth/reset-password",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            AuthOperation::SignIn => "Login failed",
            AuthOperation::SignUp => "Registration failed",
            AuthOperation::UpdateProfile => "Profile update failed",
            AuthOperation::ForgotPassword => "Failed to send verification code",
            AuthOperation::ResetPassword => "Reset password failed",
        }
    }
}

impl fmt::Display for AuthOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Client-side errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("{operation} request failed: {source}")]
    Transport {
        operation: AuthOperation,
        #[source]
        source: reqwest::Error,
    },
    #[error("{operation} rejected with {status}")]
    Rejected {
        operation: AuthOperation,
        status: StatusCode,
        message: Option<String>,
    },
    #[error("No active session")]
    NoActiveSession,
    #[error("Session not persisted: {0}")]
    Storage(#[from] FolioError),
    #[error("Invalid auth backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    /// Message suitable for showing in the initiating form
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Rejected {
                message: Some(message),
                ..
            } => message.clone(),
            ClientError::Rejected { operation, .. } | ClientError::Transport { operation, .. } => {
                operation.default_message().to_string()
            }
            ClientError::NoActiveSession => "You are not logged in".to_string(),
            ClientError::Storage(_) => "Could not save your session".to_string(),
            ClientError::InvalidUrl(_) => "Error".to_string(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Clone, Serialize)]
pub struct SignInRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

/// Sign-in payload: the identity plus its bearer token
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub access_token: String,
}

impl SignInResponse {
    pub fn into_session(self) -> (User, SessionToken) {
        let user = User {
            id: self.id,
            username: self.username,
            email: self.email,
            roles: self.roles,
            avatar_url: self.avatar_url,
        };
        (user, SessionToken::new(self.access_token))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Thin typed wrapper over the auth backend's HTTP API
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AuthClient {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> ClientResult<Self> {
        // Without a trailing slash Url::join would drop the last path segment
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn sign_in(&self, request: &SignInRequest) -> ClientResult<SignInResponse> {
        let operation = AuthOperation::SignIn;
        let response = self
            .http
            .post(self.base_url.join(operation.path())?)
            .json(request)
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        Self::decode(operation, response).await
    }

    /// Register an account. The response body is not needed; callers sign in next.
    pub async fn sign_up(&self, request: &SignUpRequest) -> ClientResult<()> {
        let operation = AuthOperation::SignUp;
        let response = self
            .http
            .post(self.base_url.join(operation.path())?)
            .json(request)
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        Self::check(operation, response).await.map(drop)
    }

    pub async fn update_profile(
        &self,
        token: &SessionToken,
        update: &ProfileUpdate,
    ) -> ClientResult<User> {
        let operation = AuthOperation::UpdateProfile;
        let response = self
            .http
            .put(self.base_url.join(operation.path())?)
            .bearer_auth(token.as_str())
            .json(update)
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        Self::decode(operation, response).await
    }

    pub async fn forgot_password(&self, email: &str) -> ClientResult<()> {
        let operation = AuthOperation::ForgotPassword;
        let response = self
            .http
            .post(self.base_url.join(operation.path())?)
            .json(&serde_json::json!({ "email": email }))
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        Self::check(operation, response).await.map(drop)
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> ClientResult<()> {
        let operation = AuthOperation::ResetPassword;
        let response = self
            .http
            .post(self.base_url.join(operation.path())?)
            .json(request)
            .send()
            .await
            .map_err(|source| ClientError::Transport { operation, source })?;
        Self::check(operation, response).await.map(drop)
    }

    /// Turn non-2xx responses into `Rejected`, keeping the backend's message
    async fn check(
        operation: AuthOperation,
        response: reqwest::Response,
    ) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            debug!("{} succeeded with {}", operation, status);
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message);
        warn!("{} rejected with {}", operation, status);
        Err(ClientError::Rejected {
            operation,
            status,
            message,
        })
    }

    async fn decode<T: serde::de::DeserializeOwned>(
        operation: AuthOperation,
        response: reqwest::Response,
    ) -> ClientResult<T> {
        Self::check(operation, response)
            .await?
            .json::<T>()
            .await
            .map_err(|source| ClientError::Transport { operation, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let client = AuthClient::new("https://example.com/users").unwrap();
        assert_eq!(
            client.base_url.join(AuthOperation::SignIn.path()).unwrap().as_str(),
            "https://example.com/users/api/auth/signin"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            AuthClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_user_message_prefers_backend_message() {
        let err = ClientError::Rejected {
            operation: AuthOperation::SignIn,
            status: StatusCode::UNAUTHORIZED,
            message: Some("Bad credentials".into()),
        };
        assert_eq!(err.user_message(), "Bad credentials");

        let err = ClientError::Rejected {
            operation: AuthOperation::SignUp,
            status: StatusCode::BAD_REQUEST,
            message: None,
        };
        assert_eq!(err.user_message(), "Registration failed");
    }

    #[test]
    fn test_sign_in_response_splits_token() {
        let raw = r#"{"id":3,"username":"m","email":"m@x.io","roles":["ROLE_MODERATOR"],"avatarUrl":null,"accessToken":"jwt"}"#;
        let (user, token) = serde_json::from_str::<SignInResponse>(raw)
            .unwrap()
            .into_session();
        assert!(user.has_role(&Role::Moderator));
        assert_eq!(token.as_str(), "jwt");
    }
}
