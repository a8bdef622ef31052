//! Route definitions for the Folio web server

use crate::{gate::NOT_FOUND_PATH, handlers, AppState};
use axum::{routing::get, Router};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/posts", get(handlers::list_posts))
        .route("/session", get(handlers::session_info))
}

/// Create page routes. Gating happens in front of these, not inside them.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::home))
        .route("/blog", get(handlers::blog_index))
        .route("/blog/page/{page}", get(handlers::blog_page))
        .route("/blog/{*slug}", get(handlers::blog_post))
        .route("/admin", get(handlers::admin))
        .route("/admin/{*rest}", get(handlers::admin))
        .route("/settings", get(handlers::settings))
        .route("/settings/{*rest}", get(handlers::settings))
        .route("/waiting", get(handlers::waiting))
        .route(NOT_FOUND_PATH, get(handlers::not_found))
}
