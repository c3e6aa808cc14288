use std::time::Duration;

use async_trait::async_trait;
use opsdesk_contract::{FileRecord, ListKind, OperationResult};
use opsdesk_transfer::FileTransferService;
use tracing::{debug, warn};

use crate::transport::OpsTransport;

/// Mock transport that calls a local [`FileTransferService`] directly,
/// optionally simulating network latency.
#[derive(Clone)]
pub struct InMemoryTransport {
    service: FileTransferService,
    latency: Duration,
}

impl InMemoryTransport {
    pub fn new(service: FileTransferService) -> Self {
        Self {
            service,
            latency: Duration::ZERO,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn service(&self) -> &FileTransferService {
        &self.service
    }

    async fn simulate_network(&self, verb: &str, path: &str) {
        debug!(verb, path, "mock ops api call");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl OpsTransport for InMemoryTransport {
    async fn fetch_list(&self, kind: ListKind) -> Vec<FileRecord> {
        self.simulate_network("GET", kind.path()).await;
        match self.service.list(kind).await {
            Ok(records) => records,
            Err(err) => {
                warn!(path = kind.path(), error = %err, "mock list fetch failed");
                Vec::new()
            }
        }
    }

    async fn acknowledge(&self, file_id: &str) -> OperationResult {
        self.simulate_network("POST", "/acknowledge").await;
        match self.service.acknowledge(file_id).await {
            Ok(file) => OperationResult::ok(file),
            Err(err) => OperationResult::rejected(err.rejection_message()),
        }
    }

    async fn transfer(&self, file_id: &str) -> OperationResult {
        self.simulate_network("POST", "/transfer").await;
        match self.service.initiate_transfer(file_id).await {
            Ok(file) => OperationResult::ok(file),
            Err(err) => OperationResult::rejected(err.rejection_message()),
        }
    }
}
