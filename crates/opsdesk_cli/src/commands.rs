use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};
use opsdesk_client::{HttpTransport, InMemoryTransport, OpsTransport, DEFAULT_BASE_URL};
use opsdesk_contract::{FileRecord, ListKind, OperationResult, TransferStatus};
use opsdesk_dashboard::{filter_files, render_notifications, render_table, Dashboard};
use opsdesk_storage::InMemoryFileStore;
use opsdesk_transfer::{FileTransferService, TransferSettings};
use tracing::{debug, info};

#[derive(Debug, Clone, Args)]
pub struct BackendArgs {
    /// Base URL of the ops API.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub url: String,
    /// Talk to an in-process demo backend instead of `--url`.
    #[arg(long)]
    pub mock: bool,
    /// Simulated network delay for `--mock`.
    #[arg(long, default_value_t = 500)]
    pub mock_latency_ms: u64,
}

#[derive(Debug, Subcommand)]
pub enum OperatorCommand {
    /// List files waiting for acknowledgement.
    Notifications {
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Show the transfer queue.
    Queue {
        #[arg(long, default_value = "")]
        search: String,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Acknowledge a new file so it enters the transfer queue.
    Acknowledge {
        file_id: String,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Start moving a queued file to local storage.
    Transfer {
        file_id: String,
        /// Poll the queue until the file is TRANSFERRED.
        #[arg(long)]
        wait: bool,
        #[arg(long, default_value_t = 500)]
        poll_ms: u64,
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Load the dashboard and print both panels.
    Dashboard {
        #[arg(long, default_value = "")]
        search: String,
        #[command(flatten)]
        backend: BackendArgs,
    },
}

pub async fn run(command: OperatorCommand) -> Result<()> {
    match command {
        OperatorCommand::Notifications { backend } => {
            let transport = build_transport(&backend);
            let notifications = transport.fetch_list(ListKind::Notifications).await;
            print!("{}", render_notifications(&notifications));
        }
        OperatorCommand::Queue { search, backend } => {
            let transport = build_transport(&backend);
            let queue = transport.fetch_list(ListKind::Queue).await;
            let rows: Vec<FileRecord> = filter_files(&queue, &search).into_iter().cloned().collect();
            print!("{}", render_table(&rows));
        }
        OperatorCommand::Acknowledge { file_id, backend } => {
            let transport = build_transport(&backend);
            let result = transport.acknowledge(&file_id).await;
            report("acknowledged", &file_id, result)?;
        }
        OperatorCommand::Transfer {
            file_id,
            wait,
            poll_ms,
            timeout_secs,
            backend,
        } => {
            let transport = build_transport(&backend);
            let result = transport.transfer(&file_id).await;
            report("transfer started for", &file_id, result)?;

            if wait {
                let record = wait_for_transfer(
                    transport.as_ref(),
                    &file_id,
                    Duration::from_millis(poll_ms),
                    Duration::from_secs(timeout_secs),
                )
                .await?;
                println!(
                    "{} transferred to {}",
                    record.id,
                    record.local_path.as_deref().unwrap_or("local storage")
                );
            }
        }
        OperatorCommand::Dashboard { search, backend } => {
            let dashboard = Dashboard::new(build_transport(&backend));
            dashboard.mount().await;
            dashboard.set_search_term(search).await;
            dashboard.toggle_notifications().await;
            print!("{}", dashboard.snapshot().await.render());
        }
    }
    Ok(())
}

fn build_transport(args: &BackendArgs) -> Arc<dyn OpsTransport> {
    if args.mock {
        info!("using in-process demo backend");
        let service = FileTransferService::new(
            Arc::new(InMemoryFileStore::demo()),
            TransferSettings::default(),
        );
        Arc::new(
            InMemoryTransport::new(service)
                .with_latency(Duration::from_millis(args.mock_latency_ms)),
        )
    } else {
        Arc::new(HttpTransport::new(args.url.clone()))
    }
}

fn report(action: &str, file_id: &str, result: OperationResult) -> Result<()> {
    if !result.success {
        bail!(
            "{file_id}: {}",
            result.error.unwrap_or_else(|| "request rejected".to_string())
        );
    }
    let status = result
        .file
        .map(|file| file.status.to_string())
        .unwrap_or_else(|| "ok".to_string());
    println!("{action} {file_id} ({status})");
    Ok(())
}

/// Polls the queue until `file_id` reports TRANSFERRED.
async fn wait_for_transfer(
    transport: &dyn OpsTransport,
    file_id: &str,
    poll: Duration,
    timeout: Duration,
) -> Result<FileRecord> {
    let polling = async {
        let mut ticker = tokio::time::interval(poll);
        loop {
            ticker.tick().await;
            let queue = transport.fetch_list(ListKind::Queue).await;
            match queue.into_iter().find(|record| record.id == file_id) {
                Some(record) if record.status == TransferStatus::Transferred => return record,
                Some(record) => debug!(file_id, status = %record.status, "transfer in flight"),
                None => debug!(file_id, "file not visible in queue"),
            }
        }
    };

    tokio::time::timeout(timeout, polling)
        .await
        .map_err(|_| anyhow!("timed out waiting for {file_id} to finish transferring"))
}
