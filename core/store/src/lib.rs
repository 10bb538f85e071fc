pub mod database;
pub mod error;

pub use database::{MemoryStore, DEFAULT_LOAD_LIMIT, TIMESTAMP_FORMAT};
pub use error::StoreError;
