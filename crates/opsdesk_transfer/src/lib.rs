mod error;
mod service;

pub use error::TransferError;
pub use service::{FileTransferService, TransferSettings};
