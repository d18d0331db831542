//! Error types for draw operations

/// Errors from a draw.
///
/// Running out of stock is not an error; `draw` reports it as `Ok(None)`.
/// The only failure mode is a consume removal that could not be durably
/// recorded; such a draw must not be reported as delivered, and retrying is
/// safe because the prior pool contents were never disturbed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("draw not committed: {0}")]
    Persist(#[from] pool_store::Error),
}

/// Result alias for draw operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_error_carries_store_context() {
        let err = Error::from(pool_store::Error::Persist("disk full".into()));
        assert_eq!(
            err.to_string(),
            "draw not committed: pool persistence failed: disk full"
        );
    }
}
