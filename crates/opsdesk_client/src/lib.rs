mod http;
mod memory;
mod transport;

pub use http::{HttpTransport, TransportError, Verb, DEFAULT_BASE_URL};
pub use memory::InMemoryTransport;
pub use transport::OpsTransport;
