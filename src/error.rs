use thiserror::Error;

/// Failures raised by a [`crate::storage::KeyValueStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
    #[error("storage quota exceeded ({needed} bytes needed, {limit} allowed)")]
    QuotaExceeded {
        needed: usize,
        limit: usize,
    },
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Why a cached conversation could not be saved or restored.
///
/// These never leave the storage adapter; they are logged and turned into a
/// miss or a `false` return.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("storage probe failed: {0}")]
    Unavailable(#[source] StoreError),
    #[error("entry '{key}' is corrupted: {source}")]
    Corrupted {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("entry '{key}' expired at {expiry}")]
    Expired {
        key: String,
        expiry: i64,
    },
    #[error("failed to serialize entry '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}
