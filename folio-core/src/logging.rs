//! Unified logging system
//!
//! Structured `tracing` output with configurable format and destination

use serde::{Deserialize, Serialize};
use std::io;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Whether to include file and line information
    pub include_location: bool,
    /// Whether to include thread information
    pub include_thread: bool,
    /// Log file path; stdout when unset
    pub log_file_path: Option<String>,
    /// Emit an event when spans close (with timings)
    pub span_events: bool,
    /// Custom filter directives
    pub filter_directives: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            include_location: false,
            include_thread: false,
            log_file_path: None,
            span_events: false,
            filter_directives: vec![
                "folio_core=info".to_string(),
                "folio_client=info".to_string(),
                "folio_web=info".to_string(),
            ],
        }
    }
}

impl LoggingConfig {
    /// Same config with a different base level, used by `--log-level` flags
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Initialize the logging system
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    for directive in &config.filter_directives {
        filter = filter.add_directive(directive.parse()?);
    }

    let writer = match &config.log_file_path {
        Some(log_path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_path)?;
            BoxMakeWriter::new(file)
        }
        None => BoxMakeWriter::new(io::stdout),
    };

    let span_events = if config.span_events {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let fmt_layer = fmt::layer()
        .with_span_events(span_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_thread_ids(config.include_thread)
        .with_thread_names(config.include_thread)
        .with_writer(writer);

    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry.with(fmt_layer.json()).try_init()?,
        LogFormat::Pretty => registry.with(fmt_layer.pretty()).try_init()?,
        LogFormat::Compact => registry.with(fmt_layer.compact()).try_init()?,
    }

    Ok(())
}

/// Logging macros for common patterns
#[macro_export]
macro_rules! log_operation_start {
    ($operation:expr) => {
        tracing::info!(
            operation = $operation,
            "Starting operation"
        );
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::info!(
            operation = $operation,
            $($field)*,
            "Starting operation"
        );
    };
}

#[macro_export]
macro_rules! log_operation_success {
    ($operation:expr) => {
        tracing::info!(
            operation = $operation,
            "Operation completed successfully"
        );
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::info!(
            operation = $operation,
            $($field)*,
            "Operation completed successfully"
        );
    };
}

#[macro_export]
macro_rules! log_operation_error {
    ($operation:expr, $error:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "Operation failed"
        );
    };
    ($operation:expr, $error:expr, $($field:tt)*) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            $($field)*,
            "Operation failed"
        );
    };
}
