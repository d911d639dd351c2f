//! Error types for chaintree.
//!
//! One enum covers every failure the aggregation core can report. The
//! variants follow the propagation policy of the system:
//!
//! | Variant | Policy |
//! |---------|--------|
//! | StorageUnavailable | propagated, caller retries with backoff |
//! | MalformedRecord | recovered locally with defaults, logged |
//! | PartialBatchFailure | reported structurally, never raised by a batch submit |
//! | MissingConfiguration | fatal at construction time |
//! | Conflict | optimistic retries exhausted, caller may retry |
//! | Cancelled | batch submission cancelled, caller retries the whole batch |

use thiserror::Error;

/// All chaintree errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying store cannot be reached or rejected the whole call
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A stored value could not be decoded
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Some items of a batch write failed while others succeeded
    #[error("partial batch failure: {} of {total} rows failed", failed_rows.len())]
    PartialBatchFailure {
        /// Row keys of the failed items, in input order
        failed_rows: Vec<String>,
        /// Number of items in the batch
        total: usize,
    },

    /// Required configuration is absent
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    /// Configuration is present but cannot be parsed
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Concurrent modification detected and retries were exhausted
    #[error("conflict: {0}")]
    Conflict(String),

    /// The operation was cancelled before the write was issued
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Caller supplied an unusable argument
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for chaintree operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Retrying is safe for these because merges are idempotent per chain id.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::StorageUnavailable(_) | Error::Conflict(_) | Error::Cancelled(_)
        )
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if this is a decode failure.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Error::MalformedRecord(_))
    }
}
