use std::sync::Arc;

use opsdesk_client::OpsTransport;
use opsdesk_contract::{
    FileRecord, ListKind, OperationResult, TransferStatus, TRANSFER_REJECTED,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::filter::filter_files;
use crate::render::{render_notifications, render_table};

#[derive(Debug)]
struct FilterCache {
    revision: u64,
    term: String,
    rows: Vec<FileRecord>,
}

#[derive(Debug, Default)]
struct DashboardState {
    notifications: Vec<FileRecord>,
    files: Vec<FileRecord>,
    files_revision: u64,
    search_term: String,
    show_notifications: bool,
    last_error: Option<String>,
    filter_cache: Option<FilterCache>,
    filter_runs: u64,
}

impl DashboardState {
    fn replace_files(&mut self, files: Vec<FileRecord>) {
        self.files = files;
        self.files_revision += 1;
    }

    fn filtered(&mut self) -> Vec<FileRecord> {
        let fresh = matches!(
            &self.filter_cache,
            Some(cache) if cache.revision == self.files_revision && cache.term == self.search_term
        );

        if !fresh {
            let rows = filter_files(&self.files, &self.search_term)
                .into_iter()
                .cloned()
                .collect();
            self.filter_runs += 1;
            self.filter_cache = Some(FilterCache {
                revision: self.files_revision,
                term: self.search_term.clone(),
                rows,
            });
        }

        self.filter_cache
            .as_ref()
            .map(|cache| cache.rows.clone())
            .unwrap_or_default()
    }
}

/// Point-in-time copy of what the dashboard would render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSnapshot {
    pub notifications: Vec<FileRecord>,
    pub rows: Vec<FileRecord>,
    pub search_term: String,
    pub show_notifications: bool,
    pub last_error: Option<String>,
}

impl DashboardSnapshot {
    pub fn notification_count(&self) -> usize {
        self.notifications.len()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if !self.search_term.is_empty() {
            out.push_str(&format!("Search: {}\n", self.search_term));
        }
        out.push_str(&render_table(&self.rows));
        out.push_str(&format!(
            "\nNotifications ({})\n",
            self.notification_count()
        ));
        if self.show_notifications {
            out.push_str(&render_notifications(&self.notifications));
        }
        if let Some(error) = &self.last_error {
            out.push_str(&format!("\nLast error: {error}\n"));
        }
        out
    }
}

/// Client-side view over the ops backend: a transfer table and a
/// notification panel. Both lists are caches refreshed from the backend;
/// mutations patch them locally and then refetch.
#[derive(Clone)]
pub struct Dashboard {
    transport: Arc<dyn OpsTransport>,
    state: Arc<Mutex<DashboardState>>,
}

impl Dashboard {
    pub fn new(transport: Arc<dyn OpsTransport>) -> Self {
        Self {
            transport,
            state: Arc::new(Mutex::new(DashboardState::default())),
        }
    }

    /// Initial load. Both lists are fetched concurrently; an empty result
    /// for one does not hold back the other.
    pub async fn mount(&self) {
        let (queue, notifications) = tokio::join!(
            self.transport.fetch_list(ListKind::Queue),
            self.transport.fetch_list(ListKind::Notifications),
        );

        let mut state = self.state.lock().await;
        info!(
            queued = queue.len(),
            notifications = notifications.len(),
            "dashboard mounted"
        );
        state.replace_files(queue);
        state.notifications = notifications;
    }

    pub async fn refresh_queue(&self) {
        let files = self.transport.fetch_list(ListKind::Queue).await;
        self.state.lock().await.replace_files(files);
    }

    pub async fn refresh_notifications(&self) {
        let notifications = self.transport.fetch_list(ListKind::Notifications).await;
        self.state.lock().await.notifications = notifications;
    }

    /// "Get File" on a notification.
    pub async fn acknowledge(&self, file_id: &str) -> OperationResult {
        let result = self.transport.acknowledge(file_id).await;

        if result.success {
            {
                let mut state = self.state.lock().await;
                state.notifications.retain(|n| n.id != file_id);
                state.last_error = None;
            }
            self.refresh_queue().await;
        } else {
            warn!(file_id, error = ?result.error, "acknowledge rejected");
            self.state.lock().await.last_error = Some(
                result
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("could not acknowledge {file_id}")),
            );
        }

        result
    }

    /// "Transfer" on a queue row. The row shows PROCESSING immediately; the
    /// queue is refetched afterwards whatever the outcome.
    pub async fn transfer(&self, file_id: &str) -> OperationResult {
        {
            let mut state = self.state.lock().await;
            let mut patched = false;
            if let Some(row) = state.files.iter_mut().find(|f| f.id == file_id) {
                if row.status != TransferStatus::ReadyToTransfer {
                    return OperationResult::rejected(TRANSFER_REJECTED);
                }
                row.status = TransferStatus::Processing;
                patched = true;
            }
            if patched {
                state.files_revision += 1;
            }
        }

        let result = self.transport.transfer(file_id).await;
        if result.success {
            self.state.lock().await.last_error = None;
        } else {
            warn!(file_id, error = ?result.error, "transfer rejected");
            self.state.lock().await.last_error = Some(
                result
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("could not transfer {file_id}")),
            );
        }

        self.refresh_queue().await;
        result
    }

    pub async fn set_search_term(&self, term: impl Into<String>) {
        self.state.lock().await.search_term = term.into();
    }

    pub async fn toggle_notifications(&self) -> bool {
        let mut state = self.state.lock().await;
        state.show_notifications = !state.show_notifications;
        state.show_notifications
    }

    /// Queue rows matching the current search term.
    pub async fn filtered_files(&self) -> Vec<FileRecord> {
        self.state.lock().await.filtered()
    }

    pub async fn notifications(&self) -> Vec<FileRecord> {
        self.state.lock().await.notifications.clone()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    pub async fn snapshot(&self) -> DashboardSnapshot {
        let mut state = self.state.lock().await;
        let rows = state.filtered();
        DashboardSnapshot {
            notifications: state.notifications.clone(),
            rows,
            search_term: state.search_term.clone(),
            show_notifications: state.show_notifications,
            last_error: state.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex as StdMutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use opsdesk_client::{InMemoryTransport, OpsTransport};
    use opsdesk_contract::{FileRecord, ListKind, OperationResult, TransferStatus};
    use opsdesk_storage::InMemoryFileStore;
    use opsdesk_transfer::{FileTransferService, TransferSettings};
    use tokio::sync::Notify;

    use super::Dashboard;

    const DELAY: Duration = Duration::from_millis(1000);

    fn mock_dashboard() -> Dashboard {
        let service = FileTransferService::new(
            Arc::new(InMemoryFileStore::demo()),
            TransferSettings {
                completion_delay: DELAY,
                local_root: "/local/accessible".to_string(),
            },
        );
        Dashboard::new(Arc::new(InMemoryTransport::new(service)))
    }

    /// Backend whose transfer call waits until released.
    struct GatedTransport {
        queue: StdMutex<Vec<FileRecord>>,
        notifications: Vec<FileRecord>,
        gate: Arc<Notify>,
        transfer_result: OperationResult,
        queue_fetches: AtomicUsize,
    }

    #[async_trait]
    impl OpsTransport for GatedTransport {
        async fn fetch_list(&self, kind: ListKind) -> Vec<FileRecord> {
            match kind {
                ListKind::Queue => {
                    self.queue_fetches.fetch_add(1, Ordering::SeqCst);
                    self.queue.lock().map(|q| q.clone()).unwrap_or_default()
                }
                ListKind::Notifications => self.notifications.clone(),
            }
        }

        async fn acknowledge(&self, _file_id: &str) -> OperationResult {
            OperationResult::rejected("backend unavailable")
        }

        async fn transfer(&self, _file_id: &str) -> OperationResult {
            self.gate.notified().await;
            self.transfer_result.clone()
        }
    }

    fn gated(transfer_result: OperationResult) -> (Arc<GatedTransport>, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(GatedTransport {
            queue: StdMutex::new(vec![FileRecord::new(
                "F103",
                "Compliance_Audit.pdf",
                "Compliance_Data",
                TransferStatus::ReadyToTransfer,
            )]),
            notifications: vec![FileRecord::new(
                "F101",
                "Medical_Report_1.pdf",
                "HR_Metrics",
                TransferStatus::New,
            )],
            gate: gate.clone(),
            transfer_result,
            queue_fetches: AtomicUsize::new(0),
        });
        (transport, gate)
    }

    #[tokio::test]
    async fn mount_loads_both_lists() {
        let dashboard = mock_dashboard();
        dashboard.mount().await;

        let snapshot = dashboard.snapshot().await;
        assert_eq!(snapshot.notification_count(), 2);
        assert_eq!(snapshot.rows.len(), 1);
        assert_eq!(snapshot.rows[0].id, "F103");
    }

    #[tokio::test]
    async fn acknowledge_removes_notification_and_refreshes_queue() {
        let dashboard = mock_dashboard();
        dashboard.mount().await;

        let result = dashboard.acknowledge("F101").await;
        assert!(result.success);

        let notifications = dashboard.notifications().await;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].id, "F102");

        let ids: Vec<_> = dashboard
            .filtered_files()
            .await
            .into_iter()
            .map(|f| f.id)
            .collect();
        assert_eq!(ids, ["F101", "F103"]);
    }

    #[tokio::test]
    async fn failed_acknowledge_keeps_state_and_records_error() {
        let (transport, _gate) = gated(OperationResult::ok_empty());
        let dashboard = Dashboard::new(transport);
        dashboard.mount().await;

        let result = dashboard.acknowledge("F101").await;
        assert!(!result.success);
        assert_eq!(dashboard.notifications().await.len(), 1);
        assert_eq!(
            dashboard.last_error().await.as_deref(),
            Some("backend unavailable")
        );
    }

    #[tokio::test]
    async fn transfer_is_optimistic_then_reconciled() {
        let (transport, gate) = gated(OperationResult::rejected("File not ready for transfer"));
        let dashboard = Dashboard::new(transport.clone());
        dashboard.mount().await;
        let fetches_after_mount = transport.queue_fetches.load(Ordering::SeqCst);

        let pending = tokio::spawn({
            let dashboard = dashboard.clone();
            async move { dashboard.transfer("F103").await }
        });

        // Spin until the optimistic patch is visible.
        let mut seen_processing = false;
        for _ in 0..100 {
            let rows = dashboard.filtered_files().await;
            if rows[0].status == TransferStatus::Processing {
                seen_processing = true;
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(seen_processing);

        gate.notify_one();
        let result = pending.await.expect("join");
        assert!(!result.success);

        // Rejection rolls back through the refetch.
        let rows = dashboard.filtered_files().await;
        assert_eq!(rows[0].status, TransferStatus::ReadyToTransfer);
        assert_eq!(
            transport.queue_fetches.load(Ordering::SeqCst),
            fetches_after_mount + 1
        );
        assert!(dashboard.last_error().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn transfer_completion_is_seen_on_later_refresh() {
        let dashboard = mock_dashboard();
        dashboard.mount().await;

        assert!(dashboard.transfer("F103").await.success);
        assert_eq!(
            dashboard.filtered_files().await[0].status,
            TransferStatus::Processing
        );

        tokio::time::sleep(DELAY + Duration::from_millis(10)).await;
        assert_eq!(
            dashboard.filtered_files().await[0].status,
            TransferStatus::Processing
        );

        dashboard.refresh_queue().await;
        assert_eq!(
            dashboard.filtered_files().await[0].status,
            TransferStatus::Transferred
        );
    }

    #[tokio::test]
    async fn disabled_rows_do_not_reach_the_backend() {
        let dashboard = mock_dashboard();
        dashboard.mount().await;

        assert!(dashboard.transfer("F103").await.success);
        let again = dashboard.transfer("F103").await;
        assert_eq!(again, OperationResult::rejected("File not ready for transfer"));
    }

    #[tokio::test]
    async fn filter_is_memoized_until_inputs_change() {
        let dashboard = mock_dashboard();
        dashboard.mount().await;

        dashboard.filtered_files().await;
        dashboard.filtered_files().await;
        assert_eq!(dashboard.state.lock().await.filter_runs, 1);

        dashboard.set_search_term("audit").await;
        assert_eq!(dashboard.filtered_files().await.len(), 1);
        dashboard.set_search_term("nothing-matches").await;
        assert!(dashboard.filtered_files().await.is_empty());
        assert_eq!(dashboard.state.lock().await.filter_runs, 3);

        dashboard.refresh_queue().await;
        dashboard.filtered_files().await;
        assert_eq!(dashboard.state.lock().await.filter_runs, 4);
    }

    #[tokio::test]
    async fn snapshot_renders_panels() {
        let dashboard = mock_dashboard();
        dashboard.mount().await;
        assert!(dashboard.toggle_notifications().await);

        let rendered = dashboard.snapshot().await.render();
        assert!(rendered.contains("Compliance_Audit.pdf"));
        assert!(rendered.contains("Notifications (2)"));
        assert!(rendered.contains("Medical_Report_1.pdf"));
    }
}
