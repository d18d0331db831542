//! Pool storage for credential records
//!
//! A pool is an ordered sequence of records addressed through a `PoolRef`:
//! either a live in-memory sequence or a newline-delimited file that is
//! re-read on every access (the file is the single source of truth; nothing
//! is cached between calls). Durable writes go through atomic temp-file +
//! rename, so concurrent or crashing readers never observe a partially
//! written pool.

pub mod error;
pub mod store;

pub use error::{Error, Result};
pub use store::{MemPool, PoolKey, PoolRef};
