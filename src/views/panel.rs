use log::info;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use crate::cache::{ ConversationCache, LoadPhase };
use crate::dispatch::{ Notice, OptimisticDispatcher, RollbackPolicy, SubmitOutcome };
use crate::models::{ ChatMessage, ConversationId, Transcript };
use super::{ ExpandedChat, MirrorMode, TranscriptView };

pub type Hook = Box<dyn Fn() + Send + Sync>;

/// Callbacks owned by the page hosting the panel. All are optional.
#[derive(Default)]
pub struct PanelHooks {
    pub on_clear_explanation_cache: Option<Hook>,
    pub on_clear_chat_history: Option<Hook>,
    /// Refetches the explanation itself; the chat is left alone.
    pub on_refresh: Option<Hook>,
}

/// The side panel attached to an explanation: the primary surface.
///
/// Failed questions stay in its transcript so they can be asked again.
pub struct ChatPanel {
    dispatcher: Arc<OptimisticDispatcher>,
    source: watch::Receiver<Transcript>,
    view: TranscriptView,
    hooks: PanelHooks,
}

impl ChatPanel {
    pub fn new(dispatcher: Arc<OptimisticDispatcher>, hooks: PanelHooks) -> Self {
        let source = dispatcher.cache().subscribe();
        Self {
            dispatcher,
            source,
            view: TranscriptView::new(),
            hooks,
        }
    }

    pub fn dispatcher(&self) -> &Arc<OptimisticDispatcher> {
        &self.dispatcher
    }

    pub fn cache(&self) -> &Arc<ConversationCache> {
        self.dispatcher.cache()
    }

    pub async fn set_conversation(&mut self, id: Option<ConversationId>) {
        self.cache().activate(id).await;
        self.sync();
    }

    /// Catches up with the shared transcript. Returns whether the list changed.
    pub fn sync(&mut self) -> bool {
        let current = self.source.borrow_and_update().clone();
        self.view.reseed_if_changed(&current)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.view.messages()
    }

    pub fn phase(&self) -> LoadPhase {
        self.cache().phase()
    }

    pub fn is_loading(&self) -> bool {
        self.dispatcher.is_loading()
    }

    pub async fn ask(&mut self, text: &str) -> SubmitOutcome {
        let outcome = self.dispatcher.submit_question(text, RollbackPolicy::RetainOptimistic).await;
        self.sync();
        outcome
    }

    /// Asks without waiting for the answer.
    pub fn spawn_ask(&self, text: impl Into<String>) -> JoinHandle<SubmitOutcome> {
        self.dispatcher.spawn_submit(text, RollbackPolicy::RetainOptimistic)
    }

    /// Creates the full-screen view over this panel's conversation.
    pub fn expanded(&self, mode: MirrorMode) -> ExpandedChat {
        ExpandedChat::new(self.dispatcher.clone(), mode)
    }

    pub async fn clear_history(&mut self) {
        self.cache().clear().await;
        if let Some(hook) = &self.hooks.on_clear_chat_history {
            hook();
        }
        self.dispatcher.notify(Notice::HistoryCleared);
        self.sync();
    }

    /// Drops the explanation's cached state, chat included.
    pub async fn clear_explanation_cache(&mut self) {
        self.cache().clear().await;
        if let Some(hook) = &self.hooks.on_clear_explanation_cache {
            hook();
        }
        self.dispatcher.notify(Notice::ExplanationCacheCleared);
        self.sync();
    }

    pub fn refresh(&self) {
        match &self.hooks.on_refresh {
            Some(hook) => hook(),
            None => info!("No refresh handler registered"),
        }
    }

    pub fn unmount(&mut self) {
        self.cache().teardown();
        self.view.clear();
    }
}
