pub mod deferred;

use log::{ debug, info };
use std::sync::{ Arc, Mutex, MutexGuard };
use tokio::sync::watch;
use tokio::time::Instant;
use crate::config::CacheConfig;
use crate::models::{ ChatMessage, ConversationId, Transcript };
use crate::storage::{ conversation_key, StorageAdapter };

pub use deferred::DeferredTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Unloaded,
    Loading,
    Ready,
}

/// A debounced save waiting for its settle window to pass.
#[derive(Debug)]
struct PendingWrite {
    conversation_id: ConversationId,
    _task: DeferredTask,
}

#[derive(Debug)]
struct CacheState {
    active: Option<ConversationId>,
    /// Bumped whenever the current context is abandoned: activation,
    /// clear, teardown. Mutations tagged with an older value are dropped.
    generation: u64,
    /// Bumped on activation and teardown only.
    activation: u64,
    /// Set while the activation's load is outstanding. Mutations made in
    /// that window are written only once the restore has been merged.
    load_pending: bool,
    pending_write: Option<PendingWrite>,
    dwell: Option<DeferredTask>,
}

/// Owns the transcript of the active conversation and keeps its persisted
/// copy up to date.
///
/// Loading happens when a conversation becomes active. Every mutation
/// publishes a fresh [`Transcript`] to subscribers and reschedules a single
/// trailing-edge write. Switching conversations or tearing down cancels the
/// pending write without flushing it.
pub struct ConversationCache {
    adapter: Arc<StorageAdapter>,
    config: CacheConfig,
    state: Mutex<CacheState>,
    transcript: watch::Sender<Transcript>,
    phase: Arc<watch::Sender<LoadPhase>>,
}

impl ConversationCache {
    pub fn new(adapter: Arc<StorageAdapter>, config: CacheConfig) -> Self {
        let (transcript, _) = watch::channel(Transcript::default());
        let (phase, _) = watch::channel(LoadPhase::Unloaded);
        Self {
            adapter,
            config,
            state: Mutex::new(CacheState {
                active: None,
                generation: 0,
                activation: 0,
                load_pending: false,
                pending_write: None,
                dwell: None,
            }),
            transcript,
            phase: Arc::new(phase),
        }
    }

    pub fn adapter(&self) -> &Arc<StorageAdapter> {
        &self.adapter
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<Transcript> {
        self.transcript.subscribe()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<LoadPhase> {
        self.phase.subscribe()
    }

    pub fn transcript(&self) -> Transcript {
        self.transcript.borrow().clone()
    }

    pub fn phase(&self) -> LoadPhase {
        *self.phase.borrow()
    }

    pub fn active(&self) -> Option<ConversationId> {
        self.lock().active.clone()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// The conversation whose write is waiting for its settle window.
    pub fn pending_write(&self) -> Option<ConversationId> {
        self.lock()
            .pending_write.as_ref()
            .map(|pending| pending.conversation_id.clone())
    }

    pub fn storage_key(&self, id: &ConversationId) -> String {
        conversation_key(&self.config.key_prefix, id)
    }

    /// Makes `id` the active conversation and restores its transcript.
    ///
    /// `None` means no conversation: the transcript still works in memory
    /// but nothing is loaded or persisted. Activating the id that is already
    /// active is a no-op.
    pub async fn activate(&self, id: Option<ConversationId>) {
        let (key, generation, activation) = {
            let mut state = self.lock();
            if state.active == id && self.phase() != LoadPhase::Unloaded {
                return;
            }
            self.leave(&mut state);
            state.active = id.clone();
            let Some(id) = id else {
                self.phase.send_replace(LoadPhase::Ready);
                return;
            };
            state.load_pending = true;
            self.phase.send_replace(LoadPhase::Loading);
            (self.storage_key(&id), state.generation, state.activation)
        };

        let started = Instant::now();
        let restored: Option<Vec<ChatMessage>> = self.adapter.load(&key).await;

        let mut state = self.lock();
        if state.activation != activation {
            debug!("Discarding load of '{}': conversation changed", key);
            return;
        }
        state.load_pending = false;
        let appended_meanwhile = self.transcript();
        let next = match restored {
            Some(messages) if state.generation == generation && !messages.is_empty() => {
                info!("Restored {} messages from '{}'", messages.len(), key);
                let mut merged = messages;
                merged.extend(appended_meanwhile.to_vec());
                let merged = Transcript::new(merged);
                self.transcript.send_replace(merged.clone());
                merged
            }
            _ => {
                debug!("No cached transcript for '{}'", key);
                appended_meanwhile.clone()
            }
        };
        if !appended_meanwhile.is_empty() {
            self.schedule_write(&mut state, &next);
        }

        let remaining = self.config.min_dwell.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            self.phase.send_replace(LoadPhase::Ready);
        } else {
            let phase = self.phase.clone();
            state.dwell = Some(
                DeferredTask::schedule(remaining, async move {
                    phase.send_replace(LoadPhase::Ready);
                })
            );
        }
    }

    /// Appends `message` if `generation` is still current.
    pub fn append(&self, generation: u64, message: ChatMessage) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        let next = self.transcript().appended(message);
        self.transcript.send_replace(next.clone());
        self.schedule_write(&mut state, &next);
        true
    }

    /// Removes the last message equal to `message` if `generation` is still
    /// current. Returns whether a message was removed.
    pub fn retract(&self, generation: u64, message: &ChatMessage) -> bool {
        let mut state = self.lock();
        if state.generation != generation {
            return false;
        }
        let Some(next) = self.transcript().without_last(message) else {
            return false;
        };
        self.transcript.send_replace(next.clone());
        self.schedule_write(&mut state, &next);
        true
    }

    /// Empties the transcript and deletes its persisted entry.
    pub async fn clear(&self) {
        let key = {
            let mut state = self.lock();
            state.pending_write = None;
            state.generation += 1;
            self.transcript.send_replace(Transcript::default());
            state.active.as_ref().map(|id| self.storage_key(id))
        };
        if let Some(key) = key {
            info!("Clearing cached conversation '{}'", key);
            self.adapter.remove(&key).await;
        }
    }

    /// Drops the active conversation without persisting pending edits.
    pub fn teardown(&self) {
        let mut state = self.lock();
        self.leave(&mut state);
        state.active = None;
        self.phase.send_replace(LoadPhase::Unloaded);
    }

    fn leave(&self, state: &mut CacheState) {
        if let Some(pending) = state.pending_write.take() {
            debug!("Abandoning pending write for '{}'", pending.conversation_id);
        }
        state.dwell = None;
        state.load_pending = false;
        state.generation += 1;
        state.activation += 1;
        self.transcript.send_replace(Transcript::default());
    }

    fn schedule_write(&self, state: &mut CacheState, transcript: &Transcript) {
        if transcript.is_empty() {
            state.pending_write = None;
            return;
        }
        if state.load_pending {
            return;
        }
        let Some(id) = state.active.clone() else {
            return;
        };
        let key = self.storage_key(&id);
        let adapter = self.adapter.clone();
        let snapshot = transcript.clone();
        debug!("Scheduling write of {} messages to '{}'", snapshot.len(), key);
        let task = DeferredTask::schedule(self.config.debounce, async move {
            adapter.save(&key, snapshot.messages()).await;
        });
        state.pending_write = Some(PendingWrite {
            conversation_id: id,
            _task: task,
        });
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ConversationCache {
    fn drop(&mut self) {
        self.teardown();
    }
}
