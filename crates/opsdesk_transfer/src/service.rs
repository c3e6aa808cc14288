use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use opsdesk_contract::{FileId, FileRecord, ListKind, TransferStatus};
use opsdesk_storage::{demo_records, FileStore};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::TransferError;

#[derive(Debug, Clone)]
pub struct TransferSettings {
    /// Time a file spends in PROCESSING before it lands locally.
    pub completion_delay: Duration,
    pub local_root: String,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            completion_delay: Duration::from_millis(1000),
            local_root: "/local/accessible".to_string(),
        }
    }
}

/// Drives report files through their lifecycle on top of a [`FileStore`].
///
/// Transfers complete asynchronously: `initiate_transfer` moves the file to
/// PROCESSING and schedules the completion as a tracked task. Callers observe
/// the final TRANSFERRED status by polling the queue.
#[derive(Clone)]
pub struct FileTransferService {
    store: Arc<dyn FileStore>,
    settings: TransferSettings,
    pending: Arc<Mutex<HashMap<FileId, JoinHandle<()>>>>,
}

impl FileTransferService {
    pub fn new(store: Arc<dyn FileStore>, settings: TransferSettings) -> Self {
        Self {
            store,
            settings,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn settings(&self) -> &TransferSettings {
        &self.settings
    }

    pub async fn list(&self, kind: ListKind) -> Result<Vec<FileRecord>, TransferError> {
        Ok(self.store.list_by_status(kind.statuses()).await?)
    }

    pub async fn notifications(&self) -> Result<Vec<FileRecord>, TransferError> {
        self.list(ListKind::Notifications).await
    }

    pub async fn queue(&self) -> Result<Vec<FileRecord>, TransferError> {
        self.list(ListKind::Queue).await
    }

    pub async fn get(&self, file_id: &str) -> Result<Option<FileRecord>, TransferError> {
        Ok(self.store.get(file_id).await?)
    }

    pub async fn ping(&self) -> Result<u64, TransferError> {
        Ok(self.store.count().await?)
    }

    pub async fn acknowledge(&self, file_id: &str) -> Result<FileRecord, TransferError> {
        let record = self
            .store
            .transition(file_id, TransferStatus::New, TransferStatus::ReadyToTransfer)
            .await?
            .ok_or_else(|| TransferError::NotAcknowledgeable {
                file_id: file_id.to_string(),
            })?;

        info!(file_id, file_name = %record.file_name, "notification acknowledged");
        Ok(record)
    }

    pub async fn initiate_transfer(&self, file_id: &str) -> Result<FileRecord, TransferError> {
        let record = self
            .store
            .transition(
                file_id,
                TransferStatus::ReadyToTransfer,
                TransferStatus::Processing,
            )
            .await?
            .ok_or_else(|| TransferError::NotReady {
                file_id: file_id.to_string(),
            })?;

        let local_path = format!(
            "{}/{}",
            self.settings.local_root.trim_end_matches('/'),
            record.file_name
        );

        // Held across the spawn so the task's own removal cannot run first.
        let mut pending = self.pending.lock().await;
        let handle = tokio::spawn(complete_after_delay(
            Arc::clone(&self.store),
            Arc::clone(&self.pending),
            record.id.clone(),
            local_path,
            self.settings.completion_delay,
        ));
        if let Some(stale) = pending.insert(record.id.clone(), handle) {
            stale.abort();
        }
        drop(pending);

        info!(
            file_id,
            delay_ms = self.settings.completion_delay.as_millis() as u64,
            "transfer started"
        );
        Ok(record)
    }

    /// Ids whose deferred completion has not run yet.
    pub async fn pending_transfers(&self) -> Vec<FileId> {
        let mut ids: Vec<FileId> = self.pending.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Aborts every scheduled completion. Affected files stay PROCESSING.
    pub async fn shutdown(&self) -> usize {
        let drained: Vec<_> = self.pending.lock().await.drain().collect();
        let count = drained.len();
        for (file_id, handle) in drained {
            handle.abort();
            warn!(file_id = %file_id, "pending transfer completion aborted");
        }
        count
    }

    /// Registers a file that just landed on the remote side.
    pub async fn discover_new_file(
        &self,
        file_name: &str,
        destination_group: &str,
    ) -> Result<FileRecord, TransferError> {
        let mut record = FileRecord::new(
            Uuid::now_v7().to_string(),
            file_name,
            destination_group,
            TransferStatus::New,
        )
        .with_remote_path(format!("/remote/source/{file_name}"));
        record.date_created = Some(Utc::now().to_rfc3339());

        let record = self.store.insert(record).await?;
        info!(file_id = %record.id, file_name, destination_group, "new remote file discovered");
        Ok(record)
    }

    /// Populates an empty store with the demo files. Returns how many were added.
    pub async fn seed_demo_files(&self) -> Result<usize, TransferError> {
        if self.store.count().await? > 0 {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;
        for mut record in demo_records() {
            record.date_created = Some(now.clone());
            self.store.insert(record).await?;
            inserted += 1;
        }
        info!(inserted, "demo files seeded");
        Ok(inserted)
    }
}

async fn complete_after_delay(
    store: Arc<dyn FileStore>,
    pending: Arc<Mutex<HashMap<FileId, JoinHandle<()>>>>,
    file_id: FileId,
    local_path: String,
    delay: Duration,
) {
    tokio::time::sleep(delay).await;

    match store.complete_transfer(&file_id, &local_path).await {
        Ok(Some(_)) => info!(file_id = %file_id, local_path = %local_path, "file transferred to local storage"),
        Ok(None) => warn!(file_id = %file_id, "completion skipped: file no longer processing"),
        Err(err) => error!(file_id = %file_id, error = %err, "transfer completion failed"),
    }

    pending.lock().await.remove(&file_id);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use opsdesk_contract::{StorageLocation, TransferStatus, TRANSFER_REJECTED};
    use opsdesk_storage::{FileStore, InMemoryFileStore};

    use super::{FileTransferService, TransferSettings};
    use crate::error::TransferError;

    const DELAY: Duration = Duration::from_millis(1000);

    fn service_with(store: InMemoryFileStore) -> FileTransferService {
        FileTransferService::new(
            Arc::new(store),
            TransferSettings {
                completion_delay: DELAY,
                local_root: "/local/accessible".to_string(),
            },
        )
    }

    fn demo_service() -> FileTransferService {
        service_with(InMemoryFileStore::demo())
    }

    #[tokio::test]
    async fn acknowledge_moves_notification_into_queue() {
        let service = service_with(InMemoryFileStore::with_records(vec![
            opsdesk_contract::FileRecord::new("F101", "Medical_Report_1.pdf", "HR_Metrics", TransferStatus::New),
        ]));

        let record = service.acknowledge("F101").await.expect("acknowledge");
        assert_eq!(record.status, TransferStatus::ReadyToTransfer);

        assert!(service.notifications().await.expect("notifications").is_empty());
        let queue = service.queue().await.expect("queue");
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, "F101");
        assert_eq!(queue[0].status, TransferStatus::ReadyToTransfer);
    }

    #[tokio::test]
    async fn acknowledge_outside_new_is_rejected_without_change() {
        let service = demo_service();

        let err = service.acknowledge("F103").await.expect_err("not new");
        assert!(matches!(err, TransferError::NotAcknowledgeable { .. }));
        assert_eq!(
            err.rejection_message(),
            "File not found or already acknowledged"
        );

        let record = service.get("F103").await.expect("get").expect("present");
        assert_eq!(record.status, TransferStatus::ReadyToTransfer);
    }

    #[tokio::test(start_paused = true)]
    async fn transfer_completes_after_delay() {
        let service = demo_service();

        let record = service.initiate_transfer("F103").await.expect("transfer");
        assert_eq!(record.status, TransferStatus::Processing);

        let queue = service.queue().await.expect("queue");
        assert_eq!(queue[0].status, TransferStatus::Processing);
        assert_eq!(service.pending_transfers().await, vec!["F103".to_string()]);

        tokio::time::sleep(DELAY + Duration::from_millis(10)).await;

        let queue = service.queue().await.expect("queue");
        assert_eq!(queue[0].status, TransferStatus::Transferred);
        assert_eq!(queue[0].current_location, Some(StorageLocation::Local));
        assert_eq!(
            queue[0].local_path.as_deref(),
            Some("/local/accessible/Compliance_Audit.pdf")
        );
        assert!(service.pending_transfers().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn second_transfer_is_rejected_by_guard() {
        let service = demo_service();

        service.initiate_transfer("F103").await.expect("first");
        let err = service.initiate_transfer("F103").await.expect_err("second");
        assert!(matches!(err, TransferError::NotReady { .. }));
        assert_eq!(service.pending_transfers().await.len(), 1);
    }

    #[tokio::test]
    async fn transfer_of_unknown_file_leaves_store_untouched() {
        let service = demo_service();

        let err = service.initiate_transfer("F999").await.expect_err("missing");
        assert_eq!(err.rejection_message(), TRANSFER_REJECTED);
        assert!(err.is_rejection());
        assert_eq!(service.ping().await.expect("count"), 3);
        assert!(service.pending_transfers().await.is_empty());
    }

    #[tokio::test]
    async fn transfer_requires_acknowledgement_first() {
        let service = demo_service();

        assert!(service.initiate_transfer("F101").await.is_err());
        let record = service.get("F101").await.expect("get").expect("present");
        assert_eq!(record.status, TransferStatus::New);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_aborts_pending_completions() {
        let service = demo_service();
        service.initiate_transfer("F103").await.expect("transfer");

        assert_eq!(service.shutdown().await, 1);
        tokio::time::sleep(DELAY * 2).await;

        let record = service.get("F103").await.expect("get").expect("present");
        assert_eq!(record.status, TransferStatus::Processing);
    }

    #[tokio::test]
    async fn seeding_only_fills_empty_store() {
        let store = Arc::new(InMemoryFileStore::new());
        let service = FileTransferService::new(store.clone(), TransferSettings::default());

        assert_eq!(service.seed_demo_files().await.expect("seed"), 3);
        assert_eq!(service.seed_demo_files().await.expect("seed"), 0);
        assert_eq!(store.count().await.expect("count"), 3);
    }

    #[tokio::test]
    async fn discovered_files_start_as_notifications() {
        let service = service_with(InMemoryFileStore::new());

        let record = service
            .discover_new_file("Q4_Liquidity.pdf", "Finance_Reports")
            .await
            .expect("discover");
        assert_eq!(record.status, TransferStatus::New);
        assert_eq!(record.remote_path.as_deref(), Some("/remote/source/Q4_Liquidity.pdf"));
        assert!(record.date_created.is_some());

        let notifications = service.notifications().await.expect("notifications");
        assert_eq!(notifications, vec![record]);
    }
}
