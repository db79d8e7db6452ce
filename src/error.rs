//! The cache's error taxonomy, as one `thiserror` enum.
//!
//! `thiserror` is the convention this pack reaches for almost
//! universally for exactly this shape of error enum (see DESIGN.md).

use thiserror::Error;

/// One variant per distinct failure kind a caller needs to tell apart.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The catalog has no entry covering the requested timestamp.
    #[error("unable to find time: {timestamp}")]
    NotFound { timestamp: i64 },

    /// A blob could not be decoded. Fatal to the owning request; the
    /// blob's `downloaded` bit must not be set on this path.
    #[error("failed to decode blob: {0}")]
    Decode(String),

    /// The object store read (list or download) failed.
    #[error("object store error: {0}")]
    Io(String),

    /// An invariant was violated (LRU `select` for an absent key, an
    /// unparseable blob key). These never get silently downgraded.
    #[error("programming error: {0}")]
    Programming(String),

    /// A request parameter failed validation.
    #[error("invalid request: {0}")]
    Validation(String),
}

impl CacheError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, CacheError::NotFound { .. } | CacheError::Validation(_))
    }
}
