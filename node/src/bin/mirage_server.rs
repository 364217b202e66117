use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mirage_node::{server, HandshakeTelemetry, NodeConfig};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mirage-server", about = "Hybrid X25519 + ML-KEM handshake server")]
struct Cli {
    /// JSON config file; flags override its values
    #[arg(long, env = "MIRAGE_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Scheme assumed when a client does not name one
    #[arg(long)]
    kem_scheme: Option<String>,
    /// Refuse classical-only clients
    #[arg(long)]
    require_pq: bool,
    #[arg(long)]
    welcome: Option<String>,
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => NodeConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(listen) = cli.listen {
        config.listen_addr = listen;
    }
    if let Some(scheme) = cli.kem_scheme {
        config.kem_scheme = scheme;
    }
    if let Some(welcome) = cli.welcome {
        config.welcome_message = welcome;
    }
    config.require_pq |= cli.require_pq;
    config.verbose_logging |= cli.verbose;

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    let telemetry = Arc::new(HandshakeTelemetry::new());

    server::serve(listener, &config, telemetry.clone(), async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install signal handler");
        }
    })
    .await
    .context("server failed")?;

    let stats = telemetry.snapshot();
    info!(
        hybrid = stats.hybrid_sessions,
        classical = stats.classical_sessions,
        downgrades = stats.downgrades,
        failures = stats.failures,
        "server stopped"
    );
    Ok(())
}
