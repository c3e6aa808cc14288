pub mod record;
pub mod result;

pub use record::{
    FileId, FileRecord, ListKind, StatusParseError, StorageLocation, TransferStatus,
};
pub use result::{OperationResult, ACKNOWLEDGE_REJECTED, TRANSFER_REJECTED};
