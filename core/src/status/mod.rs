// imgflow/src/status/mod.rs

//! Status records, the stores that hold them, and the query path that reads them back.

pub mod query;
pub mod record;
pub mod store;

pub use query::{StatusLookup, StatusQuery, StatusResponse, StatusStoreAccessor};
pub use record::StatusRecord;
pub use store::{InMemoryStatusStore, JsonFileStatusStore, StatusStore};
