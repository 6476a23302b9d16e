//! Provider dispatch: picks the provider/model for a prompt from the saved
//! session, builds the backend payload, sends it over the native bridge or
//! HTTP, and turns whatever comes back into display text.

pub mod backend;
pub mod catalog;
pub mod error;
pub mod payload;
pub mod probe;
pub mod reply;
pub mod router;
pub mod session;
pub mod store;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use backend::BackendClient;
pub use error::{DispatchError, StoreError};
pub use probe::ProbeReport;
pub use router::{ChatResult, Dispatcher, FallbackRule, SendPhase, Selected};
pub use session::{SessionContext, Snapshot};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use transport::{ChatTransport, NativeBridge};
