//! Configuration management

use crate::access::AccessPolicy;
use crate::error::{ErrorContext, FolioError, FolioResult};
use crate::logging::LoggingConfig;
use crate::validation_error;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration shared by the server and the client tools
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub content: ContentConfig,
    pub logging: LoggingConfig,
}

/// Auth backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Base URL of the user/auth backend
    pub base_url: String,
    /// Development override: every caller is treated as privileged
    pub grant_all_access: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            grant_all_access: false,
        }
    }
}

impl AuthConfig {
    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(self.grant_all_access)
    }
}

/// Storage keys, cookie names and logout behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub token_cookie: String,
    pub user_cookie: String,
    pub token_key: String,
    pub user_key: String,
    /// Shared lifetime of both session cookies
    pub cookie_max_age_days: u32,
    /// Countdown on the waiting page before returning home
    pub logout_redirect_secs: u32,
    pub waiting_path: String,
    pub home_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_cookie: "token".to_string(),
            user_cookie: "user".to_string(),
            token_key: "token".to_string(),
            user_key: "user".to_string(),
            cookie_max_age_days: 7,
            logout_redirect_secs: 2,
            waiting_path: "/waiting".to_string(),
            home_path: "/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// JSON file listing content entries
    pub index_path: PathBuf,
    /// Posts per listing page
    pub posts_per_page: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("content/index.json"),
            posts_per_page: 5,
        }
    }
}

impl FolioConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> FolioResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| FolioError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        let config: FolioConfig = toml::from_str(&content).map_err(|e| FolioError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> FolioResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| FolioError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        std::fs::write(path, content).map_err(|e| FolioError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> FolioResult<()> {
        if self.auth.base_url.trim().is_empty() {
            return Err(validation_error!(
                "auth.base_url must not be empty",
                "auth.base_url",
                "config",
                "Set auth.base_url to the user backend URL"
            ));
        }

        let session = &self.session;
        if session.token_cookie.is_empty() || session.user_cookie.is_empty() {
            return Err(validation_error!(
                "Session cookie names must not be empty",
                "session.user_cookie",
                "config",
                "Set session.token_cookie and session.user_cookie"
            ));
        }

        if session.token_cookie == session.user_cookie || session.token_key == session.user_key {
            return Err(validation_error!(
                "Token and user must be stored under different names",
                "session.user_cookie",
                "config",
                "Use distinct values for the token and user cookie names and keys"
            ));
        }

        if session.logout_redirect_secs == 0 {
            return Err(validation_error!(
                "session.logout_redirect_secs must be greater than 0",
                "session.logout_redirect_secs",
                "config",
                "Set session.logout_redirect_secs to a positive value"
            ));
        }

        if self.content.posts_per_page == 0 {
            return Err(validation_error!(
                "content.posts_per_page must be greater than 0",
                "content.posts_per_page",
                "config",
                "Set content.posts_per_page to a positive value"
            ));
        }

        Ok(())
    }
}
