//! Auth flow tests against an in-process mock auth backend

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{post, put};
use axum::{Json, Router};
use folio_client::{
    AuthClient, AuthFlow, ClientError, CookieStore, MemoryBackend, SessionContext, SessionKeys,
    SessionStore, SignUpRequest, StorageBackend, TracingNavigator,
};
use folio_core::{AccessPolicy, ProfileUpdate, Role};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

#[derive(Clone)]
struct Account {
    id: u64,
    email: String,
    password: String,
    role: &'static str,
    avatar_url: Option<String>,
}

type Accounts = Arc<Mutex<HashMap<String, Account>>>;

fn account_json(username: &str, account: &Account) -> Value {
    json!({
        "id": account.id,
        "username": username,
        "email": account.email,
        "roles": [account.role],
        "avatarUrl": account.avatar_url,
    })
}

async fn signin(State(accounts): State<Accounts>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let username = body["username"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();
    let accounts = accounts.lock().unwrap();

    match accounts.get(username) {
        Some(account) if account.password == password => {
            let mut response = account_json(username, account);
            response["accessToken"] = json!(format!("tok-{}", username));
            (StatusCode::OK, Json(response))
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Bad credentials" })),
        ),
    }
}

async fn signup(State(accounts): State<Accounts>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let mut accounts = accounts.lock().unwrap();
    if accounts.contains_key(&username) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Username is already taken!" })),
        );
    }

    let id = accounts.len() as u64 + 1;
    accounts.insert(
        username,
        Account {
            id,
            email: body["email"].as_str().unwrap_or_default().to_string(),
            password: body["password"].as_str().unwrap_or_default().to_string(),
            role: "ROLE_USER",
            avatar_url: body["avatarUrl"].as_str().map(str::to_string),
        },
    );
    (
        StatusCode::OK,
        Json(json!({ "message": "User registered successfully!" })),
    )
}

async fn profile(
    State(accounts): State<Accounts>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let username = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer tok-"))
        .map(str::to_string);

    let unauthorized = (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Unauthorized" })),
    );
    let Some(username) = username else {
        return unauthorized;
    };
    let mut accounts = accounts.lock().unwrap();
    let Some(account) = accounts.get_mut(&username) else {
        return unauthorized;
    };

    if let Some(email) = body["email"].as_str() {
        account.email = email.to_string();
    }
    if let Some(avatar_url) = body["avatarUrl"].as_str() {
        account.avatar_url = Some(avatar_url.to_string());
    }
    (StatusCode::OK, Json(account_json(&username, account)))
}

async fn forgot_password(
    State(accounts): State<Accounts>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let email = body["email"].as_str().unwrap_or_default();
    let known = accounts.lock().unwrap().values().any(|a| a.email == email);
    if known {
        (StatusCode::OK, Json(json!({ "message": "Code sent" })))
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "No account for that email" })),
        )
    }
}

/// Spawn the mock backend with one moderator account
async fn create_mock_backend() -> String {
    let accounts: Accounts = Arc::new(Mutex::new(HashMap::from([(
        "mod".to_string(),
        Account {
            id: 1,
            email: "mod@example.com".to_string(),
            password: "pw".to_string(),
            role: "ROLE_MODERATOR",
            avatar_url: None,
        },
    )])));

    let app = Router::new()
        .route("/api/auth/signin", post(signin))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/user/profile", put(profile))
        .with_state(accounts);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

struct Harness {
    client: AuthClient,
    cookies: Arc<CookieStore>,
    store: SessionStore,
    context: SessionContext,
}

async fn harness() -> Harness {
    let base_url = create_mock_backend().await;
    let cookies = Arc::new(CookieStore::in_memory(7));
    let store = SessionStore::new(
        Arc::new(MemoryBackend::new()),
        cookies.clone(),
        SessionKeys::default(),
    );
    let context = SessionContext::new(
        store.clone(),
        AccessPolicy::role_based(),
        Arc::new(TracingNavigator),
        "/waiting",
    );
    context.initialize();

    Harness {
        client: AuthClient::new(&base_url).unwrap(),
        cookies,
        store,
        context,
    }
}

#[tokio::test]
async fn test_sign_in_starts_privileged_session() {
    let h = harness().await;
    let flow = AuthFlow::new(&h.client, &h.context);

    let user = flow.sign_in("mod", "pw").await.unwrap();

    assert!(user.has_role(&Role::Moderator));
    assert_eq!(h.context.current(), Some(user.clone()));
    assert!(h.context.capability().is_granted());
    assert_eq!(h.store.read(), Some(user));
    assert_eq!(h.cookies.get("token").as_deref(), Some("tok-mod"));
}

#[tokio::test]
async fn test_failed_sign_in_leaves_session_untouched() {
    let h = harness().await;
    let flow = AuthFlow::new(&h.client, &h.context);

    let err = flow.sign_in("mod", "wrong").await.unwrap_err();

    assert_eq!(err.user_message(), "Bad credentials");
    assert!(matches!(err, ClientError::Rejected { status, .. } if status.as_u16() == 401));
    assert_eq!(h.context.current(), None);
    assert_eq!(h.store.read(), None);
    assert_eq!(h.cookies.header_value(), None);
}

#[tokio::test]
async fn test_sign_up_then_signs_in_without_privilege() {
    let h = harness().await;
    let flow = AuthFlow::new(&h.client, &h.context);

    let user = flow
        .sign_up(SignUpRequest {
            username: "reader".into(),
            email: "reader@example.com".into(),
            password: "secret".into(),
            avatar_url: None,
        })
        .await
        .unwrap();

    assert_eq!(user.username, "reader");
    assert!(user.has_role(&Role::User));
    assert!(!h.context.capability().is_granted());
    assert_eq!(h.store.read(), Some(user));
}

#[tokio::test]
async fn test_sign_up_rejection_reports_backend_message() {
    let h = harness().await;
    let flow = AuthFlow::new(&h.client, &h.context);

    let err = flow
        .sign_up(SignUpRequest {
            username: "mod".into(),
            email: "other@example.com".into(),
            password: "x".into(),
            avatar_url: None,
        })
        .await
        .unwrap_err();

    assert_eq!(err.user_message(), "Username is already taken!");
    assert_eq!(h.context.current(), None);
}

#[tokio::test]
async fn test_save_profile_merges_backend_identity() {
    let h = harness().await;
    let flow = AuthFlow::new(&h.client, &h.context);
    flow.sign_in("mod", "pw").await.unwrap();

    let updated = flow
        .save_profile(ProfileUpdate {
            email: Some("new@example.com".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(updated.email, "new@example.com");
    assert!(updated.has_role(&Role::Moderator));
    assert_eq!(h.store.read(), Some(updated));
    assert_eq!(h.cookies.get("token").as_deref(), Some("tok-mod"));
}

#[tokio::test]
async fn test_save_profile_requires_session() {
    let h = harness().await;
    let flow = AuthFlow::new(&h.client, &h.context);

    let err = flow
        .save_profile(ProfileUpdate {
            email: Some("x@example.com".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::NoActiveSession));
}

#[tokio::test]
async fn test_forgot_password_surfaces_backend_message() {
    let h = harness().await;

    h.client.forgot_password("mod@example.com").await.unwrap();
    let err = h
        .client
        .forgot_password("nobody@example.com")
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "No account for that email");
}

#[tokio::test]
async fn test_unreachable_backend_uses_default_message() {
    // Bind then drop to get a port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = AuthClient::new(&format!("http://{}", addr)).unwrap();
    let err = client
        .sign_in(&folio_client::SignInRequest {
            username: "mod".into(),
            password: "pw".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport { .. }));
    assert_eq!(err.user_message(), "Login failed");
}
