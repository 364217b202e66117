use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use handshake::NoopObserver;
use mirage_node::{client, NodeConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mirage-client", about = "Hybrid handshake client with backup failover")]
struct Cli {
    /// JSON config file; flags override its values
    #[arg(long, env = "MIRAGE_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long)]
    primary: Option<String>,
    #[arg(long)]
    backup: Option<String>,
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    kem_scheme: Option<String>,
    /// Do not offer a post-quantum key
    #[arg(long, conflicts_with = "require_pq")]
    classical_only: bool,
    /// Abort if the server skips the post-quantum branch
    #[arg(long)]
    require_pq: bool,
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
    if let Some(primary) = cli.primary {
        config.primary_addr = primary;
    }
    if let Some(backup) = cli.backup {
        config.backup_addr = backup;
    }
    if let Some(id) = cli.id {
        config.client_id = id;
    }
    if let Some(scheme) = cli.kem_scheme {
        config.kem_scheme = scheme;
    }
    if cli.classical_only {
        config.offer_pq = false;
    }
    config.require_pq |= cli.require_pq;
    config.verbose_logging |= cli.verbose;

    let report = client::run(&config, Arc::new(NoopObserver))
        .await
        .context("client session failed")?;

    println!("{}", report.welcome);
    println!(
        "mode={} endpoint={} fingerprint={}",
        report.mode(),
        report.endpoint,
        report.secret.fingerprint()
    );
    Ok(())
}
