use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Mutex;
use crate::error::StoreError;
use super::KeyValueStore;

/// In-process store. Can be disabled or given a byte quota to behave like a
/// restricted browser store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
    disabled: AtomicBool,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the total size of keys plus values, in bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    pub fn set_disabled(&self, disabled: bool) {
        self.disabled.store(disabled, Ordering::SeqCst);
    }

    /// Reads an entry directly, bypassing the disabled flag.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    /// Writes an entry directly, bypassing the disabled flag and the quota.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.lock().insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_enabled(&self) -> Result<(), StoreError> {
        if self.disabled.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.check_enabled()?;
        Ok(self.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_enabled()?;
        let mut entries = self.lock();
        if let Some(limit) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = used + key.len() + value.len();
            if needed > limit {
                return Err(StoreError::QuotaExceeded { needed, limit });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_enabled()?;
        self.lock().remove(key);
        Ok(())
    }
}
