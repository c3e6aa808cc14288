mod memory;
mod repository;
mod store;

pub use memory::{demo_records, InMemoryFileStore};
pub use repository::{SqliteFileStore, StorageConfig};
pub use store::FileStore;
