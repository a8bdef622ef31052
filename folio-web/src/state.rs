//! Application state shared by the gate and the handlers

use crate::{WebConfig, WebError, WebResult};
use folio_core::{AccessPolicy, ContentIndex, FolioConfig};
use std::sync::Arc;
use tracing::info;

/// Read-only per-process state. Every request sees the same content index and
/// policy; nothing in here is mutated after startup.
#[derive(Debug, Clone)]
pub struct AppState {
    pub web: WebConfig,
    pub config: Arc<FolioConfig>,
    pub content: Arc<ContentIndex>,
    pub policy: AccessPolicy,
}

impl AppState {
    /// Load the content index named by the configuration
    pub fn new(web: WebConfig, config: FolioConfig) -> WebResult<Self> {
        let content =
            ContentIndex::from_file(&config.content.index_path).map_err(WebError::Content)?;
        info!(
            "Loaded {} content entries from {}",
            content.len(),
            config.content.index_path.display()
        );
        Ok(Self::with_content(web, config, content))
    }

    pub fn with_content(web: WebConfig, config: FolioConfig, content: ContentIndex) -> Self {
        let policy = config.auth.access_policy();
        Self {
            web,
            config: Arc::new(config),
            content: Arc::new(content),
            policy,
        }
    }
}
