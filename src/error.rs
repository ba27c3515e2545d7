//! Error type shared by every fallible operation.

use thiserror::Error;

/// Errors reported by [`ExtendibleHash`](crate::ExtendibleHash) operations.
///
/// Every variant except [`Error::Internal`] is raised before any state is
/// touched, so a failed call leaves the structure exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("bucket capacity must be at least {min}, got {capacity}", min = crate::config::MIN_BUCKET_CAPACITY)]
    InvalidConfiguration { capacity: usize },

    #[error("maximum global depth must be in 1..{bits}, got {max_global_depth}", bits = usize::BITS)]
    InvalidDepthLimit { max_global_depth: u8 },

    /// Identical keys never separate under splitting
    #[error("key {key} is already stored {capacity} times, which fills a bucket")]
    DuplicateOverflow { key: u64, capacity: usize },

    #[error("inserting key {key} needs global depth {required}, limit is {limit}")]
    DepthLimit { key: u64, required: u8, limit: u8 },

    #[error("internal invariant violated: {0}")]
    Internal(String),
}
