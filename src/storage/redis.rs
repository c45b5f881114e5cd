use async_trait::async_trait;
use redis::{ Client, AsyncCommands };
use redis::aio::MultiplexedConnection;
use std::error::Error;
use std::sync::Arc;
use tokio::sync::Mutex;
use crate::error::StoreError;
use super::KeyValueStore;

/// Redis-backed store. The connection is opened lazily and reused.
pub struct RedisStore {
    client: Client,
    conn: Mutex<Option<Arc<Mutex<MultiplexedConnection>>>>,
}

impl RedisStore {
    pub fn new(url: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(Self {
            client: Client::open(url)?,
            conn: Mutex::new(None),
        })
    }

    async fn connection(&self) -> Result<Arc<Mutex<MultiplexedConnection>>, StoreError> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }
        let conn = self.client
            .get_multiplexed_async_connection().await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let conn = Arc::new(Mutex::new(conn));
        *slot = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let conn = self.connection().await?;
        let mut guard = conn.lock().await;
        let value: Option<String> = guard.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let conn = self.connection().await?;
        let mut guard = conn.lock().await;
        guard.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let conn = self.connection().await?;
        let mut guard = conn.lock().await;
        guard.del::<_, ()>(key).await?;
        Ok(())
    }
}
