//! # tavern-app
//!
//! Tavern server binary — wires the store, coordinator, and transport, and
//! runs until a shutdown signal arrives.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tavern_server::config::ServerConfig;
use tavern_server::coordinator::SessionCoordinator;
use tavern_server::rpc::handlers;
use tavern_server::rpc::registry::MethodRegistry;
use tavern_server::server::TavernServer;
use tavern_server::websocket::broadcast::BroadcastManager;
use tavern_store::{new_file, run_migrations, ConnectionConfig, SessionStore};

/// Tavern tabletop session server.
#[derive(Parser, Debug)]
#[command(name = "tavern", about = "Tavern tabletop session server")]
struct Cli {
    /// Host to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (0 for auto-assign).
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Path to the `SQLite` database.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

impl Cli {
    fn default_db_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        PathBuf::from(home).join(".tavern").join("tavern.db")
    }
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;

    let db_path = cli.db_path.unwrap_or_else(Cli::default_db_path);
    ensure_parent_dir(&db_path)?;
    let pool = new_file(
        db_path.to_str().context("database path is not valid UTF-8")?,
        &ConnectionConfig::default(),
    )?;
    {
        let conn = pool.get()?;
        let applied = run_migrations(&conn)?;
        info!(db_path = %db_path.display(), applied, "database ready");
    }

    let store = Arc::new(SessionStore::new(pool));
    let broadcast = Arc::new(BroadcastManager::new());
    let coordinator = Arc::new(SessionCoordinator::new(store, broadcast));

    let mut registry = MethodRegistry::new();
    handlers::register_all(&mut registry);

    let config = ServerConfig {
        host: cli.host,
        port: cli.port,
        ..ServerConfig::default()
    };
    let server = TavernServer::new(config, coordinator, registry, metrics);
    let (addr, serve_handle) = server.listen().await?;
    info!(%addr, "tavern server running");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutdown signal received");
    server
        .shutdown()
        .graceful_shutdown(vec![serve_handle], Duration::from_secs(10))
        .await;

    Ok(())
}
