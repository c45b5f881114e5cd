use log::{ debug, info, warn };
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use crate::clock::Clock;
use crate::error::{ CacheError, StoreError };
use crate::models::{ ConversationId, StorageEnvelope };
use super::KeyValueStore;

/// Written and removed again by every probe.
pub const PROBE_KEY: &str = "__storage_test__";

pub const DEFAULT_TTL: Duration = Duration::from_millis(7 * 24 * 60 * 60 * 1000);

pub fn conversation_key(prefix: &str, id: &ConversationId) -> String {
    format!("{}{}", prefix, id)
}

/// Best-effort persistence with TTL envelopes on top of a [`KeyValueStore`].
///
/// No operation here returns an error. An unavailable store, a corrupted or
/// expired entry, or a failed write all degrade to a miss or `false`;
/// corrupted and expired entries are deleted on the way.
pub struct StorageAdapter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
}

impl StorageAdapter {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            ttl_ms: DEFAULT_TTL.as_millis() as i64,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Checks that the store accepts a write and a delete.
    pub async fn probe(&self) -> bool {
        match self.try_probe().await {
            Ok(()) => true,
            Err(e) => {
                debug!("Storage probe failed: {}", e);
                false
            }
        }
    }

    pub async fn save<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.try_save(key, value).await {
            Ok(()) => {
                debug!("Saved entry '{}'", key);
                true
            }
            Err(e) => {
                warn!("Failed to save entry '{}': {}", key, e);
                false
            }
        }
    }

    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_load(key).await {
            Ok(found) => found,
            Err(e @ CacheError::Unavailable(_)) => {
                debug!("Skipping load of '{}': {}", key, e);
                None
            }
            Err(e @ CacheError::Expired { .. }) => {
                info!("Purged {}", e);
                None
            }
            Err(e) => {
                warn!("Purged unreadable entry: {}", e);
                None
            }
        }
    }

    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            debug!("Failed to remove entry '{}': {}", key, e);
        }
    }

    async fn try_probe(&self) -> Result<(), StoreError> {
        self.store.set(PROBE_KEY, PROBE_KEY).await?;
        self.store.remove(PROBE_KEY).await
    }

    async fn try_save<T: Serialize + Sync + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        self.try_probe().await.map_err(CacheError::Unavailable)?;
        let envelope = StorageEnvelope::wrap(value, self.clock.now_millis(), self.ttl_ms);
        let raw = serde_json::to_string(&envelope).map_err(|source| CacheError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.store.set(key, &raw).await?;
        Ok(())
    }

    async fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        self.try_probe().await.map_err(CacheError::Unavailable)?;
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        let envelope: StorageEnvelope<T> = match serde_json::from_str(&raw) {
            Ok(envelope) => envelope,
            Err(source) => {
                self.remove(key).await;
                return Err(CacheError::Corrupted { key: key.to_string(), source });
            }
        };
        if envelope.is_expired(self.clock.now_millis()) {
            self.remove(key).await;
            return Err(CacheError::Expired { key: key.to_string(), expiry: envelope.expiry });
        }
        Ok(Some(envelope.data))
    }
}
