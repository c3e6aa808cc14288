use opsdesk_contract::{FileId, ACKNOWLEDGE_REJECTED, TRANSFER_REJECTED};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("file {file_id} is missing or already acknowledged")]
    NotAcknowledgeable { file_id: FileId },
    #[error("file {file_id} is missing or not ready for transfer")]
    NotReady { file_id: FileId },
    #[error("storage failure: {0}")]
    Storage(#[from] anyhow::Error),
}

impl TransferError {
    /// Message surfaced to dashboard clients in `{success: false, error}`.
    pub fn rejection_message(&self) -> String {
        match self {
            TransferError::NotAcknowledgeable { .. } => ACKNOWLEDGE_REJECTED.to_string(),
            TransferError::NotReady { .. } => TRANSFER_REJECTED.to_string(),
            TransferError::Storage(err) => format!("storage failure: {err}"),
        }
    }

    pub fn is_rejection(&self) -> bool {
        !matches!(self, TransferError::Storage(_))
    }
}
