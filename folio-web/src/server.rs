//! Folio Web Server
//!
//! Main web server implementation using Axum.

use crate::{create_app, AppState, WebConfig, WebError, WebResult};
use axum::serve;
use folio_core::{ContentIndex, FolioConfig};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Main Folio web server
pub struct FolioServer {
    config: WebConfig,
    state: AppState,
}

impl FolioServer {
    /// Create a server, loading the content index named in `folio`
    pub fn new(config: WebConfig, folio: FolioConfig) -> WebResult<Self> {
        let state = AppState::new(config.clone(), folio)?;
        Ok(Self { config, state })
    }

    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.web.clone(),
            state,
        }
    }

    /// Start the web server
    pub async fn start(self) -> WebResult<()> {
        let address = self.config.address();

        info!("Starting Folio Web Server");
        info!("Server address: http://{}", address);
        info!("Development mode: {}", self.config.dev_mode);
        if self.state.policy.grants_all_access() {
            warn!("Route gate is open: auth.grant_all_access is set");
        }

        let app = create_app(self.state.clone());

        let listener = TcpListener::bind(&address)
            .await
            .map_err(WebError::Server)?;

        info!("Server listening on http://{}", address);

        if let Err(e) = serve(listener, app).await {
            error!("Server error: {}", e);
            return Err(WebError::Server(e));
        }

        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &WebConfig {
        &self.config
    }

    /// Get application state
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Builder for FolioServer
pub struct FolioServerBuilder {
    config: WebConfig,
    folio: FolioConfig,
    content: Option<ContentIndex>,
}

impl FolioServerBuilder {
    /// Create a new server builder
    pub fn new() -> Self {
        Self {
            config: WebConfig::default(),
            folio: FolioConfig::default(),
            content: None,
        }
    }

    /// Set the server host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the server port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Enable development mode
    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.dev_mode = dev_mode;
        self
    }

    pub fn folio_config(mut self, folio: FolioConfig) -> Self {
        self.folio = folio;
        self
    }

    /// Use an in-memory content index instead of loading `content.index_path`
    pub fn content(mut self, content: ContentIndex) -> Self {
        self.content = Some(content);
        self
    }

    /// Build the server
    pub fn build(self) -> WebResult<FolioServer> {
        match self.content {
            Some(content) => Ok(FolioServer::with_state(AppState::with_content(
                self.config,
                self.folio,
                content,
            ))),
            None => FolioServer::new(self.config, self.folio),
        }
    }
}

impl Default for FolioServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_builder() {
        let builder = FolioServerBuilder::new()
            .host("localhost")
            .port(3000)
            .dev_mode(true);

        assert_eq!(builder.config.host, "localhost");
        assert_eq!(builder.config.port, 3000);
        assert!(builder.config.dev_mode);
    }

    #[test]
    fn test_build_with_in_memory_content() {
        let server = FolioServerBuilder::new()
            .port(0)
            .content(ContentIndex::default())
            .build()
            .unwrap();
        assert_eq!(server.config().port, 0);
        assert!(server.state().content.is_empty());
    }

    #[test]
    fn test_missing_content_index_fails_build() {
        let mut folio = FolioConfig::default();
        folio.content.index_path = "/definitely/not/here.json".into();
        let result = FolioServerBuilder::new().folio_config(folio).build();
        assert!(matches!(result, Err(WebError::Content(_))));
    }
}
