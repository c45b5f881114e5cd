#![allow(dead_code)]

use async_trait::async_trait;
use followup_chat::cache::ConversationCache;
use followup_chat::clock::{ Clock, ManualClock };
use followup_chat::config::CacheConfig;
use followup_chat::dispatch::OptimisticDispatcher;
use followup_chat::error::StoreError;
use followup_chat::llm::{ FollowupClient, FollowupRequest };
use followup_chat::models::{ ChatMessage, ConversationId, StorageEnvelope };
use followup_chat::storage::{ KeyValueStore, MemoryStore, StorageAdapter, PROBE_KEY };
use std::collections::VecDeque;
use std::error::Error;
use std::sync::{ Arc, Mutex };
use std::time::Duration;

pub const START_MS: i64 = 1_700_000_000_000;
pub const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Memory store that remembers every non-probe write.
#[derive(Default)]
pub struct RecordingStore {
    pub inner: MemoryStore,
    writes: Mutex<Vec<(String, String)>>,
    read_delay: Mutex<Duration>,
}

impl RecordingStore {
    /// Makes every `get` take `delay` on tokio's clock.
    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = delay;
    }

    pub fn writes_to(&self, key: &str) -> Vec<String> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn envelope(&self, key: &str) -> Option<StorageEnvelope<Vec<ChatMessage>>> {
        self.inner.raw(key).map(|raw| serde_json::from_str(&raw).expect("valid envelope"))
    }
}

#[async_trait]
impl KeyValueStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let delay = *self.read_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value).await?;
        if key != PROBE_KEY {
            self.writes.lock().unwrap().push((key.to_string(), value.to_string()));
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }
}

pub enum Reply {
    Answer(&'static str),
    Fail(&'static str),
}

/// Answers from a script, after an optional delay on tokio's clock.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<FollowupRequest>>,
    delay: Mutex<Duration>,
}

impl ScriptedClient {
    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn requests(&self) -> Vec<FollowupRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl FollowupClient for ScriptedClient {
    async fn ask_followup(
        &self,
        request: FollowupRequest
    ) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.requests.lock().unwrap().push(request);
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Answer(text)) => Ok(text.to_string()),
            Some(Reply::Fail(message)) => Err(message.into()),
            None => Err("no scripted reply".into()),
        }
    }
}

pub struct Harness {
    pub store: Arc<RecordingStore>,
    pub clock: Arc<ManualClock>,
    pub client: Arc<ScriptedClient>,
    pub adapter: Arc<StorageAdapter>,
    pub cache: Arc<ConversationCache>,
    pub dispatcher: Arc<OptimisticDispatcher>,
}

pub fn harness() -> Harness {
    let store = Arc::new(RecordingStore::default());
    let clock = Arc::new(ManualClock::new(START_MS));
    let client = Arc::new(ScriptedClient::default());
    let wall: Arc<dyn Clock> = clock.clone();
    let adapter = Arc::new(StorageAdapter::new(store.clone(), wall.clone()));
    let cache = Arc::new(ConversationCache::new(adapter.clone(), CacheConfig::default()));
    let dispatcher = Arc::new(
        OptimisticDispatcher::new(cache.clone(), client.clone(), wall, Some("user-1".to_string()))
    );
    Harness { store, clock, client, adapter, cache, dispatcher }
}

pub fn id(value: &str) -> Option<ConversationId> {
    Some(ConversationId::new(value))
}

pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(600)).await;
}

pub fn texts(messages: &[ChatMessage]) -> Vec<&str> {
    messages.iter().map(|m| m.text.as_str()).collect()
}
