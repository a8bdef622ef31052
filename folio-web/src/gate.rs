//! Route gate
//!
//! Runs before routing for every request under a gated prefix. Protected paths
//! are only passed through when the request's own cookies carry a privileged
//! identity; everything else is rewritten to the not-found page with an
//! uncacheable response.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Cookie, HeaderMapExt};
use folio_core::{AccessPolicy, ContentIndex, SessionConfig, User, GATED_PREFIXES};
use tracing::{debug, info};

pub use folio_core::{classify_path, PathClass};

/// Internal rewrite target for denied requests
pub const NOT_FOUND_PATH: &str = "/not-found";

/// What the request's cookies say about the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvidence {
    /// Token or user cookie absent (or empty)
    Missing,
    /// User cookie present but not a readable identity
    Malformed,
    Present(User),
}

impl SessionEvidence {
    /// Both cookies must be present and the user cookie must parse. The token
    /// itself is opaque here; only its presence is checked.
    pub fn from_cookies(cookies: Option<&Cookie>, session: &SessionConfig) -> Self {
        let Some(cookies) = cookies else {
            return SessionEvidence::Missing;
        };

        let token = cookies
            .get(&session.token_cookie)
            .filter(|token| !token.is_empty());
        let user = cookies
            .get(&session.user_cookie)
            .filter(|user| !user.is_empty());

        match (token, user) {
            (Some(_), Some(raw)) => match parse_user_cookie(raw) {
                Some(user) => SessionEvidence::Present(user),
                None => SessionEvidence::Malformed,
            },
            _ => SessionEvidence::Missing,
        }
    }

    pub fn from_headers(headers: &HeaderMap, session: &SessionConfig) -> Self {
        Self::from_cookies(headers.typed_get::<Cookie>().as_ref(), session)
    }

    /// Evidence from a rendered `Cookie` header value, such as the one a
    /// client-side cookie jar sends
    pub fn from_cookie_header(value: &str, session: &SessionConfig) -> Self {
        let Ok(value) = HeaderValue::from_str(value) else {
            return SessionEvidence::Missing;
        };
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, value);
        Self::from_headers(&headers, session)
    }

    /// Identity to evaluate the policy against; `None` unless fully present
    pub fn user(&self) -> Option<&User> {
        match self {
            SessionEvidence::Present(user) => Some(user),
            SessionEvidence::Missing | SessionEvidence::Malformed => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionEvidence::Missing => "missing",
            SessionEvidence::Malformed => "malformed",
            SessionEvidence::Present(_) => "present",
        }
    }
}

/// Cookie values are written percent-encoded by clients, but accept raw JSON too
fn parse_user_cookie(raw: &str) -> Option<User> {
    if let Ok(user) = serde_json::from_str(raw) {
        return Some(user);
    }
    let decoded = urlencoding::decode(raw).ok()?;
    serde_json::from_str(&decoded).ok()
}

fn is_gated(path: &str) -> bool {
    GATED_PREFIXES.iter().any(|prefix| {
        path.strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    })
}

/// What the gate does with a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Outside the gated prefixes
    Ungated,
    Open(PathClass),
    Allowed(PathClass),
    Denied(PathClass),
}

impl GateDecision {
    pub fn evaluate(
        path: &str,
        index: &ContentIndex,
        policy: AccessPolicy,
        evidence: &SessionEvidence,
    ) -> Self {
        if !is_gated(path) {
            return GateDecision::Ungated;
        }

        let class = classify_path(path, index);
        if !class.is_protected() {
            GateDecision::Open(class)
        } else if policy.allows(class.requirement(), evidence.user()) {
            GateDecision::Allowed(class)
        } else {
            GateDecision::Denied(class)
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, GateDecision::Denied(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            GateDecision::Ungated => "ungated",
            GateDecision::Open(class)
            | GateDecision::Allowed(class)
            | GateDecision::Denied(class) => class.label(),
        }
    }
}

/// Gate middleware. Denials keep the browser URL but serve the not-found page.
pub async fn route_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let evidence = SessionEvidence::from_headers(request.headers(), &state.config.session);
    let decision = GateDecision::evaluate(&path, &state.content, state.policy, &evidence);

    match &decision {
        GateDecision::Ungated => return next.run(request).await,
        GateDecision::Open(class) => {
            debug!(path = %path, class = class.label(), "Unprotected path");
            return next.run(request).await;
        }
        GateDecision::Allowed(class) => {
            debug!(path = %path, class = class.label(), "Access granted");
            return next.run(request).await;
        }
        GateDecision::Denied(class) => {
            info!(
                path = %path,
                class = class.label(),
                evidence = evidence.label(),
                "Access denied, serving not-found"
            );
        }
    }

    *request.uri_mut() = Uri::from_static(NOT_FOUND_PATH);
    let mut response = next.run(request).await;
    *response.status_mut() = StatusCode::NOT_FOUND;
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store, max-age=0"),
    );
    response
}
