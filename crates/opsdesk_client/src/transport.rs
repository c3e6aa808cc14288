use async_trait::async_trait;
use opsdesk_contract::{FileRecord, ListKind, OperationResult};

/// Capability the dashboard needs from a backend, whichever store sits
/// behind it.
///
/// Failure policy is fixed for every implementation: list reads never fail
/// and degrade to an empty list, mutations never fail and report problems
/// through `OperationResult { success: false, error }`.
#[async_trait]
pub trait OpsTransport: Send + Sync {
    async fn fetch_list(&self, kind: ListKind) -> Vec<FileRecord>;

    async fn acknowledge(&self, file_id: &str) -> OperationResult;

    async fn transfer(&self, file_id: &str) -> OperationResult;
}
