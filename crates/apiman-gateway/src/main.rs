//! API Manager gateway — entry point.
//!
//! # Command line
//!
//! | Flag | Variable | Default | Description |
//! |------|----------|---------|-------------|
//! | `--config` | `APIMAN_CONFIG` | `config.yaml` | Endpoint configuration file (YAML, TOML or JSON). |
//! | `--host` | `APIMAN_HOST` | `server.host` | Listen address override. |
//! | `--port` | `APIMAN_PORT` | `server.port` | Listen port override. |
//!
//! Any configuration key can also be overridden with `APIMAN_<SECTION>__<KEY>`,
//! e.g. `APIMAN_SERVER__REQUEST_TIMEOUT_MS=5000`.

use apiman_gateway::config::ApimanConfig;
use apiman_gateway::server::GatewayServer;
use clap::Parser;
use eyre::WrapErr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "apiman-gateway", version, about = "Role-gated HTTP API gateway")]
struct Cli {
    /// Configuration file listing the backend endpoints.
    #[arg(short, long, env = "APIMAN_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Address to listen on.
    #[arg(long, env = "APIMAN_HOST")]
    host: Option<String>,

    /// Port to listen on.
    #[arg(short, long, env = "APIMAN_PORT")]
    port: Option<u16>,
}

const DEFAULT_LOG_FILTER: &str = "apiman_gateway=info";

/// `RUST_LOG` when it is set and parses, [`DEFAULT_LOG_FILTER`] otherwise.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let cli = Cli::parse();

    let mut config = ApimanConfig::load(&cli.config)
        .wrap_err_with(|| format!("failed to load {}", cli.config.display()))?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    info!(
        config    = %cli.config.display(),
        endpoints = config.endpoints.len(),
        addr      = %config.server.bind_addr(),
        "starting apiman gateway"
    );

    GatewayServer::new(config)
        .start()
        .await
        .wrap_err("gateway terminated with an error")
}
