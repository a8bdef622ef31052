//! HTTP request handlers for the Folio web server
//!
//! Pages render through the Askama templates. By the time a page handler runs the
//! route gate has already decided the request may see it.

use crate::gate::SessionEvidence;
use crate::templates::{
    render_page, AdminTemplate, BlogTemplate, HomeTemplate, NotFoundTemplate, PostTemplate,
    SettingsTemplate, WaitingTemplate,
};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use folio_core::{trim_slug, ContentEntry, Role};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    version: String,
}

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    pub page: Option<usize>,
}

/// Listing entry; `need_access` lets list views draw the hover lock
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub slug: String,
    pub title: String,
    pub date: chrono::NaiveDate,
    pub tags: Vec<String>,
    pub need_access: bool,
}

impl From<&ContentEntry> for PostSummary {
    fn from(entry: &ContentEntry) -> Self {
        Self {
            slug: entry.slug.clone(),
            title: entry.title.clone(),
            date: entry.date,
            tags: entry.tags.clone(),
            need_access: entry.need_access,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsResponse {
    pub page: usize,
    pub total_pages: usize,
    pub posts: Vec<PostSummary>,
}

/// Cookie-derived view of the caller. Diagnostic only.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    pub evidence: &'static str,
    pub username: Option<String>,
    pub roles: Vec<String>,
    pub have_access: bool,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Published posts, one page at a time
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostsQuery>,
) -> Json<PostsResponse> {
    let page = state
        .content
        .page(query.page.unwrap_or(1), state.config.content.posts_per_page);

    Json(PostsResponse {
        page: page.page,
        total_pages: page.total_pages,
        posts: page.entries.into_iter().map(PostSummary::from).collect(),
    })
}

pub async fn session_info(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionResponse> {
    let evidence = SessionEvidence::from_headers(&headers, &state.config.session);
    let user = evidence.user();

    Json(SessionResponse {
        authenticated: user.is_some(),
        evidence: evidence.label(),
        username: user.map(|u| u.username.clone()),
        roles: user
            .map(|u| u.roles.iter().map(Role::to_string).collect())
            .unwrap_or_default(),
        have_access: state.policy.capability(user).is_granted(),
    })
}

pub async fn home(State(state): State<AppState>) -> Response {
    let latest = state
        .content
        .page(1, state.config.content.posts_per_page);
    render_page(&HomeTemplate::new(latest))
}

pub async fn blog_index(State(state): State<AppState>) -> Response {
    blog_listing(&state, 1)
}

pub async fn blog_page(State(state): State<AppState>, Path(page): Path<String>) -> Response {
    match page.parse::<usize>() {
        Ok(page) if page >= 1 => blog_listing(&state, page),
        _ => not_found().await.into_response(),
    }
}

fn blog_listing(state: &AppState, page: usize) -> Response {
    let page = state.content.page(page, state.config.content.posts_per_page);
    render_page(&BlogTemplate::new(page))
}

/// The extractor has already percent-decoded the slug, exactly as the gate
/// decoded the request path, so it is only trimmed here.
pub async fn blog_post(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    let Some(entry) = state
        .content
        .get(trim_slug(&slug))
        .filter(|entry| !entry.draft)
    else {
        return not_found().await.into_response();
    };

    render_page(&PostTemplate::from(entry))
}

pub async fn admin() -> Response {
    render_page(&AdminTemplate::default())
}

pub async fn settings() -> Response {
    render_page(&SettingsTemplate::default())
}

/// Logged-out interstitial; the countdown and redirect run in the browser
pub async fn waiting(State(state): State<AppState>) -> Response {
    render_page(&WaitingTemplate::new(&state.config.session))
}

/// Not-found page; also the rewrite target for denied requests
pub async fn not_found() -> (StatusCode, Response) {
    (StatusCode::NOT_FOUND, render_page(&NotFoundTemplate::default()))
}
