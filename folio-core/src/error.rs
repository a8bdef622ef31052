//! Unified error handling system
//!
//! Provides structured error types with context, recovery suggestions, and proper error chaining

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type FolioResult<T> = Result<T, FolioError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: std::collections::HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for the Folio system
#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FolioError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            FolioError::Storage { context, .. } => Some(context),
            FolioError::Config { context, .. } => Some(context),
            FolioError::Validation { context, .. } => Some(context),
            FolioError::Io(_) | FolioError::Serialization(_) => None,
        }
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FolioError::Storage { .. })
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            FolioError::Config { .. } | FolioError::Validation { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration or validation error"
                );
            }
            FolioError::Storage { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Storage error (may be recoverable)"
                );
            }
            FolioError::Io(_) | FolioError::Serialization(_) => {
                error!(error = %self, "Error occurred");
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $component:expr) => {
        $crate::FolioError::Storage {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::FolioError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::FolioError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
    ($msg:expr, $field:expr, $component:expr, $suggestion:expr) => {
        $crate::FolioError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component).with_suggestion($suggestion),
        }
    };
}
