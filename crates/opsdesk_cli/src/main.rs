mod commands;
mod config;

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use opsdesk_control_plane::{build_router, AppState, RouterOptions};
use opsdesk_storage::{FileStore, InMemoryFileStore, SqliteFileStore, StorageConfig};
use opsdesk_transfer::FileTransferService;
use tracing::{info, warn};

use crate::commands::OperatorCommand;
use crate::config::{RuntimeConfig, StorageBackend};

#[derive(Debug, Parser)]
#[command(author, version, about = "Ops file-transfer dashboard daemon and operator console")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the ops backend HTTP API.
    Serve {
        #[arg(long, default_value = "config/opsdesk.toml")]
        config: PathBuf,
    },
    #[command(flatten)]
    Operator(OperatorCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config } => serve(config).await,
        Command::Operator(command) => commands::run(command).await,
    }
}

async fn serve(config_path: PathBuf) -> Result<()> {
    let config = RuntimeConfig::load(&config_path)?;

    let store = open_store(&config).await?;
    let service = FileTransferService::new(store, config.transfer.settings());
    if config.transfer.seed_demo_files {
        let seeded = service
            .seed_demo_files()
            .await
            .context("failed to seed demo files")?;
        if seeded > 0 {
            info!(seeded, "initialized mock remote file storage");
        }
    }

    if config.http.cors {
        warn!("permissive CORS enabled: any origin may call the ops API");
    }

    let app = build_router(
        AppState::new(service.clone()),
        RouterOptions {
            permissive_cors: config.http.cors,
        },
    );

    let socket: SocketAddr = config
        .http
        .bind
        .parse()
        .with_context(|| format!("invalid socket address {}", config.http.bind))?;

    let listener = tokio::net::TcpListener::bind(socket)
        .await
        .with_context(|| format!("failed to bind {}", config.http.bind))?;

    info!(bind = %config.http.bind, "opsdeskd listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("axum server failed")?;

    let aborted = service.shutdown().await;
    info!(aborted, "opsdeskd stopped");
    Ok(())
}

async fn open_store(config: &RuntimeConfig) -> Result<Arc<dyn FileStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            info!("using in-memory file store");
            Ok(Arc::new(InMemoryFileStore::new()))
        }
        StorageBackend::Sqlite => {
            let sqlite_path = config
                .storage
                .sqlite_path
                .clone()
                .ok_or_else(|| anyhow!("storage.sqlite_path is required for the sqlite backend"))?;
            info!(path = %sqlite_path, "using sqlite file store");
            let store = SqliteFileStore::connect(&StorageConfig { sqlite_path }).await?;
            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
