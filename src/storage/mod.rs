pub mod adapter;
pub mod file;
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error as ThisError;
use crate::cli::Args;
use crate::error::StoreError;

pub use adapter::{ conversation_key, StorageAdapter, PROBE_KEY };
pub use file::FileStore;
pub use memory::MemoryStore;
pub use self::redis::RedisStore;

/// A string key-value store in the manner of a browser's local storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    Memory,
    File,
    Redis,
}

#[derive(Debug, PartialEq, Eq, ThisError)]
#[error("Invalid store type: '{0}'")]
pub struct ParseStoreTypeError(String);

impl FromStr for StoreType {
    type Err = ParseStoreTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreType::Memory),
            "file" => Ok(StoreType::File),
            "redis" => Ok(StoreType::Redis),
            _ => Err(ParseStoreTypeError(s.to_string())),
        }
    }
}

pub fn create_store(args: &Args) -> Result<Arc<dyn KeyValueStore>, Box<dyn Error + Send + Sync>> {
    let store_type: StoreType = args.store_type.parse()?;
    info!("Conversation cache will be stored in: {:?} at {}", store_type, args.store_host);
    let store: Arc<dyn KeyValueStore> = match store_type {
        StoreType::Memory => Arc::new(MemoryStore::new()),
        StoreType::File => Arc::new(FileStore::new(&args.store_host)),
        StoreType::Redis => Arc::new(RedisStore::new(&args.store_host)?),
    };
    Ok(store)
}
