//! Error types for the cache layer.

/// Errors produced by the icon cache and its storage backends.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Durable storage read/write failed.
    ///
    /// Non-fatal by contract: the in-memory cache stays valid for the
    /// session and durability is deferred to the next successful persist.
    #[error("storage error: {0}")]
    Storage(String),

    /// Cache payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
