//! Folio Web Server
//!
//! Serves the blog pages and puts the route gate in front of every gated
//! prefix, so restricted posts and private pages are only ever rendered for a
//! privileged session.

pub mod gate;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod templates;

// Re-export main types
pub use gate::{route_gate, GateDecision, SessionEvidence};
pub use server::{FolioServer, FolioServerBuilder};
pub use state::AppState;

use axum::{middleware, Router};
use folio_core::{FolioConfig, LoggingConfig};
use std::path::PathBuf;
use tower_http::trace::TraceLayer;

/// Create the main application router.
///
/// The gate wraps the page router as a fallback service so that a denied
/// request can be rewritten to the not-found route before routing happens.
pub fn create_app(state: AppState) -> Router {
    let pages = routes::page_routes()
        .nest("/api", routes::api_routes())
        .fallback(handlers::not_found)
        .with_state(state.clone());

    Router::new()
        .fallback_service(pages)
        .layer(middleware::from_fn_with_state(state, gate::route_gate))
        .layer(TraceLayer::new_for_http())
}

/// Configuration for the web server
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable development mode
    pub dev_mode: bool,
    /// Folio configuration file (TOML)
    pub config_path: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            dev_mode: false,
            config_path: None,
        }
    }
}

impl WebConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("FOLIO_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("FOLIO_PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(8080),
            dev_mode: std::env::var("FOLIO_DEV_MODE")
                .ok()
                .and_then(|flag| flag.parse().ok())
                .unwrap_or(false),
            config_path: std::env::var("FOLIO_CONFIG").ok().map(PathBuf::from),
        }
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Build the Folio configuration from the optional config file plus
    /// `FOLIO__SECTION__KEY` environment overrides
    pub fn load(&self) -> WebResult<FolioConfig> {
        let mut builder = config::Config::builder();
        if let Some(path) = &self.config_path {
            builder = builder.add_source(config::File::from(path.as_path()).required(true));
        }

        let folio: FolioConfig = builder
            .add_source(
                config::Environment::with_prefix("FOLIO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| WebError::Config(e.to_string()))?;

        folio
            .validate()
            .map_err(|e| WebError::Config(e.to_string()))?;
        Ok(folio)
    }
}

/// Error types for the web server
#[derive(thiserror::Error, Debug)]
pub enum WebError {
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Content index error: {0}")]
    Content(#[source] folio_core::FolioError),
}

/// Result type for web operations
pub type WebResult<T> = Result<T, WebError>;

/// Initialize logging for the web server
pub fn init_logging(logging: &LoggingConfig, level: Option<&str>) -> WebResult<()> {
    let mut logging = match level {
        Some(level) => logging.clone().with_level(level),
        None => logging.clone(),
    };
    logging.filter_directives.push("tower_http=debug".to_string());

    folio_core::init_logging(&logging).map_err(|e| WebError::Config(e.to_string()))
}
