use thiserror::Error;

/// Errors surfaced by the memory store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database file could not be opened. Fatal for the caller.
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] rusqlite::Error),
    /// A statement failed against an open database.
    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),
    /// The data directory could not be created.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Io(_))
    }
}
