use anyhow::Result;
use async_trait::async_trait;
use opsdesk_contract::{FileRecord, TransferStatus};

/// Repository of report files. The backing store is the single source of
/// truth; every status change goes through a compare-and-set so concurrent
/// callers racing on the same id cannot both win.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Fails if a record with the same id already exists.
    async fn insert(&self, record: FileRecord) -> Result<FileRecord>;

    async fn get(&self, file_id: &str) -> Result<Option<FileRecord>>;

    /// Records whose status is in `statuses`, in insertion order.
    async fn list_by_status(&self, statuses: &[TransferStatus]) -> Result<Vec<FileRecord>>;

    /// Moves `file_id` from `from` to `to`. Returns `None` when the id is
    /// unknown or its current status is not `from`. Errors if `to` is not
    /// the direct successor of `from`.
    async fn transition(
        &self,
        file_id: &str,
        from: TransferStatus,
        to: TransferStatus,
    ) -> Result<Option<FileRecord>>;

    /// `PROCESSING -> TRANSFERRED`, recording where the file now lives.
    async fn complete_transfer(&self, file_id: &str, local_path: &str)
        -> Result<Option<FileRecord>>;

    async fn count(&self) -> Result<u64>;
}
