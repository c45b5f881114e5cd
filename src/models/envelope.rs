use serde::{ Serialize, Deserialize };

/// The unit written to the backing store: the payload plus its write time
/// and absolute expiry, both in epoch milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorageEnvelope<T> {
    pub data: T,
    pub timestamp: i64,
    pub expiry: i64,
}

impl<T> StorageEnvelope<T> {
    pub fn wrap(data: T, now: i64, ttl_ms: i64) -> Self {
        Self {
            data,
            timestamp: now,
            expiry: now.saturating_add(ttl_ms),
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expiry
    }
}
