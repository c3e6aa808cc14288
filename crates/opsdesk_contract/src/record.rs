use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type FileId = String;

/// Lifecycle of a remote report file. Progression is strictly
/// `NEW -> READY_TO_TRANSFER -> PROCESSING -> TRANSFERRED`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferStatus {
    New,
    ReadyToTransfer,
    Processing,
    Transferred,
}

impl TransferStatus {
    pub const ALL: [TransferStatus; 4] = [
        TransferStatus::New,
        TransferStatus::ReadyToTransfer,
        TransferStatus::Processing,
        TransferStatus::Transferred,
    ];

    pub fn next(self) -> Option<TransferStatus> {
        match self {
            TransferStatus::New => Some(TransferStatus::ReadyToTransfer),
            TransferStatus::ReadyToTransfer => Some(TransferStatus::Processing),
            TransferStatus::Processing => Some(TransferStatus::Transferred),
            TransferStatus::Transferred => None,
        }
    }

    pub fn can_advance_to(self, to: TransferStatus) -> bool {
        self.next() == Some(to)
    }

    /// Statuses shown in the main transfer table.
    pub fn is_queued(self) -> bool {
        !matches!(self, TransferStatus::New)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::New => "NEW",
            TransferStatus::ReadyToTransfer => "READY_TO_TRANSFER",
            TransferStatus::Processing => "PROCESSING",
            TransferStatus::Transferred => "TRANSFERRED",
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized wire value: {0}")]
pub struct StatusParseError(pub String);

impl FromStr for TransferStatus {
    type Err = StatusParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        TransferStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == raw)
            .ok_or_else(|| StatusParseError(raw.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageLocation {
    Remote,
    Local,
}

impl StorageLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageLocation::Remote => "REMOTE",
            StorageLocation::Local => "LOCAL",
        }
    }
}

impl FromStr for StorageLocation {
    type Err = StatusParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "REMOTE" => Ok(StorageLocation::Remote),
            "LOCAL" => Ok(StorageLocation::Local),
            other => Err(StatusParseError(other.to_string())),
        }
    }
}

/// A report file as exchanged with the ops backend.
///
/// The aliases accept the field names used by the Spring backend
/// (`fileId`, `transferStatus`) so either server flavour decodes into the
/// same shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(alias = "fileId")]
    pub id: FileId,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub destination_group: String,
    #[serde(alias = "transferStatus")]
    pub status: TransferStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<StorageLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

impl FileRecord {
    pub fn new(
        id: impl Into<FileId>,
        file_name: impl Into<String>,
        destination_group: impl Into<String>,
        status: TransferStatus,
    ) -> Self {
        Self {
            id: id.into(),
            file_name: file_name.into(),
            destination_group: destination_group.into(),
            status,
            remote_path: None,
            local_path: None,
            current_location: Some(StorageLocation::Remote),
            date_created: None,
        }
    }

    pub fn with_remote_path(mut self, remote_path: impl Into<String>) -> Self {
        self.remote_path = Some(remote_path.into());
        self
    }
}

/// The two server-side lists the dashboard renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Notifications,
    Queue,
}

impl ListKind {
    pub fn path(self) -> &'static str {
        match self {
            ListKind::Notifications => "/notifications",
            ListKind::Queue => "/queue",
        }
    }

    pub fn statuses(self) -> &'static [TransferStatus] {
        match self {
            ListKind::Notifications => &[TransferStatus::New],
            ListKind::Queue => &[
                TransferStatus::ReadyToTransfer,
                TransferStatus::Processing,
                TransferStatus::Transferred,
            ],
        }
    }
}
