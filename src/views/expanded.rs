use std::sync::Arc;
use tokio::sync::watch;
use crate::dispatch::{ OptimisticDispatcher, RollbackPolicy, SubmitOutcome };
use crate::models::{ ChatMessage, Transcript };
use super::TranscriptView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorMode {
    /// Keeps its own list: seeded on open and when the shared transcript
    /// changes, with questions shown locally before they are dispatched.
    #[default]
    Independent,
    /// Shows the shared transcript only, reseeding on every sync. Failed
    /// questions stay visible, as they do in the panel.
    Live,
}

/// The full-screen chat: the secondary surface.
///
/// Questions go through the panel's dispatcher, so each one is sent and
/// persisted once whichever surface asked it. A failed question stays in
/// the shared transcript, so the panel keeps it, but is taken out of this
/// view's own list.
pub struct ExpandedChat {
    dispatcher: Arc<OptimisticDispatcher>,
    source: watch::Receiver<Transcript>,
    mirror: TranscriptView,
    mode: MirrorMode,
    open: bool,
}

impl ExpandedChat {
    pub fn new(dispatcher: Arc<OptimisticDispatcher>, mode: MirrorMode) -> Self {
        let source = dispatcher.cache().subscribe();
        Self {
            dispatcher,
            source,
            mirror: TranscriptView::new(),
            mode,
            open: false,
        }
    }

    pub fn mode(&self) -> MirrorMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
        let current = self.source.borrow_and_update().clone();
        self.mirror.seed(&current);
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Reseeds from the shared transcript if it changed since the last seed.
    /// Does nothing while closed.
    pub fn sync(&mut self) -> bool {
        if !self.open {
            return false;
        }
        let current = self.source.borrow_and_update().clone();
        match self.mode {
            MirrorMode::Independent => self.mirror.reseed_if_changed(&current),
            MirrorMode::Live => {
                let changed = !self.mirror.is_seeded_from(&current);
                self.mirror.seed(&current);
                changed
            }
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.mirror.messages()
    }

    pub fn is_loading(&self) -> bool {
        self.dispatcher.is_loading()
    }

    pub async fn submit(&mut self, text: &str) -> SubmitOutcome {
        if let Err(rejection) = self.dispatcher.check(text) {
            return SubmitOutcome::Rejected(rejection);
        }
        let local = match self.mode {
            MirrorMode::Independent => {
                let message = ChatMessage::user(
                    text,
                    self.dispatcher.clock().now_millis(),
                    self.dispatcher.user_id().map(str::to_string)
                );
                self.mirror.push(message.clone());
                Some(message)
            }
            MirrorMode::Live => None,
        };

        let dispatcher = self.dispatcher.clone();
        let outcome = dispatcher.submit_question(text, RollbackPolicy::RetainOptimistic).await;
        match (outcome, local) {
            (SubmitOutcome::Failed { error, .. }, Some(message)) => {
                let rolled_back = self.mirror.retract(&message);
                // The shared transcript still holds the question; take it as
                // seen so the next sync does not bring it back.
                let current = self.source.borrow_and_update().clone();
                self.mirror.acknowledge(&current);
                SubmitOutcome::Failed { error, rolled_back }
            }
            (outcome, local) => {
                if let Some(message) = local {
                    if !matches!(outcome, SubmitOutcome::Answered(_)) {
                        self.mirror.retract(&message);
                    }
                }
                self.sync();
                outcome
            }
        }
    }
}
