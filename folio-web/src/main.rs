//! Folio Web Server
//!
//! Serves the blog with the route gate in front of restricted pages.

use anyhow::Context;
use clap::Parser;
use folio_web::server::FolioServerBuilder;
use folio_web::{init_logging, WebConfig};
use std::path::PathBuf;
use tracing::info;

/// Folio Web Server - blog pages behind a role-based route gate
#[derive(Parser)]
#[command(name = "folio-web")]
#[command(about = "Serve the Folio blog")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable development mode
    #[arg(long)]
    dev: bool,

    /// Folio configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Environment first, then command line overrides
    let mut config = WebConfig::from_env();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config.dev_mode |= args.dev;
    if args.config.is_some() {
        config.config_path = args.config;
    }

    let folio = config.load().context("Failed to load configuration")?;
    init_logging(&folio.logging, args.log_level.as_deref())
        .context("Failed to initialize logging")?;

    info!("Auth backend: {}", folio.auth.base_url);
    info!("Content index: {}", folio.content.index_path.display());

    let server = FolioServerBuilder::new()
        .host(config.host.clone())
        .port(config.port)
        .dev_mode(config.dev_mode)
        .folio_config(folio)
        .build()
        .context("Failed to build server")?;

    server.start().await.context("Server failed")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["folio-web"]);
        assert_eq!(args.host, None);
        assert_eq!(args.port, None);
        assert!(!args.dev);

        let args = Args::parse_from([
            "folio-web",
            "--host",
            "0.0.0.0",
            "--port",
            "3000",
            "--dev",
            "--config",
            "folio.toml",
        ]);
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(3000));
        assert!(args.dev);
        assert_eq!(args.config, Some(PathBuf::from("folio.toml")));
    }
}
