//! Error types for pool storage

/// Errors from pool persistence.
///
/// Read failures never surface here: a missing or unreadable pool file reads
/// as an empty pool. Only the durable replace path can fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("pool persistence failed: {0}")]
    Persist(String),
}

/// Result alias for pool storage operations.
pub type Result<T> = std::result::Result<T, Error>;
