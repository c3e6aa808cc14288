use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use opsdesk_contract::{FileId, FileRecord, StorageLocation, TransferStatus};
use tokio::sync::RwLock;
use tracing::debug;

use crate::store::FileStore;

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<FileId, FileRecord>,
    order: Vec<FileId>,
}

/// In-memory store used when no live backend is available.
#[derive(Debug, Default)]
pub struct InMemoryFileStore {
    inner: RwLock<Inner>,
}

impl InMemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let mut inner = Inner::default();
        for record in records {
            if inner.records.contains_key(&record.id) {
                continue;
            }
            inner.order.push(record.id.clone());
            inner.records.insert(record.id.clone(), record);
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Two pending notifications and one file already queued.
    pub fn demo() -> Self {
        Self::with_records(demo_records())
    }
}

pub fn demo_records() -> Vec<FileRecord> {
    vec![
        FileRecord::new("F101", "Medical_Report_1.pdf", "HR_Metrics", TransferStatus::New)
            .with_remote_path("/remote/src/F101.pdf"),
        FileRecord::new("F102", "Ops_Log_Q3.pdf", "Ops_Reports", TransferStatus::New)
            .with_remote_path("/remote/src/F102.pdf"),
        FileRecord::new(
            "F103",
            "Compliance_Audit.pdf",
            "Compliance_Data",
            TransferStatus::ReadyToTransfer,
        )
        .with_remote_path("/remote/src/F103.pdf"),
    ]
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn insert(&self, record: FileRecord) -> Result<FileRecord> {
        let mut inner = self.inner.write().await;
        if inner.records.contains_key(&record.id) {
            bail!("file {} already exists", record.id);
        }
        inner.order.push(record.id.clone());
        inner.records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get(&self, file_id: &str) -> Result<Option<FileRecord>> {
        Ok(self.inner.read().await.records.get(file_id).cloned())
    }

    async fn list_by_status(&self, statuses: &[TransferStatus]) -> Result<Vec<FileRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id))
            .filter(|record| statuses.contains(&record.status))
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        file_id: &str,
        from: TransferStatus,
        to: TransferStatus,
    ) -> Result<Option<FileRecord>> {
        if !from.can_advance_to(to) {
            bail!("illegal status transition {from} -> {to}");
        }

        let mut inner = self.inner.write().await;
        match inner.records.get_mut(file_id) {
            Some(record) if record.status == from => {
                record.status = to;
                debug!(file_id, from = %from, to = %to, "status advanced");
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn complete_transfer(
        &self,
        file_id: &str,
        local_path: &str,
    ) -> Result<Option<FileRecord>> {
        let mut inner = self.inner.write().await;
        match inner.records.get_mut(file_id) {
            Some(record) if record.status == TransferStatus::Processing => {
                record.status = TransferStatus::Transferred;
                record.current_location = Some(StorageLocation::Local);
                record.local_path = Some(local_path.to_string());
                Ok(Some(record.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.inner.read().await.records.len() as u64)
    }
}
