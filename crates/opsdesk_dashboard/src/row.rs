use opsdesk_contract::TransferStatus;

/// How a queue row presents its transfer action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowState {
    pub label: &'static str,
    pub transfer_enabled: bool,
    pub status_class: String,
}

impl RowState {
    /// `None` for NEW: those files live in the notification panel, not the table.
    pub fn for_status(status: TransferStatus) -> Option<RowState> {
        let (label, transfer_enabled) = match status {
            TransferStatus::New => return None,
            TransferStatus::ReadyToTransfer => ("Transfer", true),
            TransferStatus::Processing => ("Moving…", false),
            TransferStatus::Transferred => ("Completed", false),
        };
        Some(RowState {
            label,
            transfer_enabled,
            status_class: status.as_str().to_lowercase().replace('_', "-"),
        })
    }
}
