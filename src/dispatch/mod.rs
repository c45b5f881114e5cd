use log::{ debug, info, warn };
use std::sync::atomic::{ AtomicBool, Ordering };
use std::sync::Arc;
use tokio::sync::{ broadcast, watch };
use tokio::task::JoinHandle;
use crate::cache::ConversationCache;
use crate::clock::Clock;
use crate::llm::{ FollowupClient, FollowupRequest };
use crate::models::ChatMessage;

const NOTICE_CAPACITY: usize = 32;

/// What happens to the optimistic user message when the answer call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackPolicy {
    /// Leave the question in place so the failed attempt stays visible.
    RetainOptimistic,
    /// Take the question back out, as if it had never been sent.
    RemoveOptimistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyInput,
    InFlight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Rejected(Rejection),
    Answered(ChatMessage),
    Failed {
        error: String,
        rolled_back: bool,
    },
    /// The answer arrived after the conversation it belonged to was left.
    Discarded,
}

/// User-facing notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    AnswerFailed {
        message: String,
    },
    HistoryCleared,
    ExplanationCacheCleared,
}

/// Runs follow-up questions against the remote answer call, updating the
/// transcript before the answer is known.
pub struct OptimisticDispatcher {
    cache: Arc<ConversationCache>,
    client: Arc<dyn FollowupClient>,
    clock: Arc<dyn Clock>,
    user_id: Option<String>,
    in_flight: AtomicBool,
    loading: watch::Sender<bool>,
    notices: broadcast::Sender<Notice>,
}

/// Clears the in-flight and loading flags however the submission ends.
struct InFlightGuard<'a> {
    in_flight: &'a AtomicBool,
    loading: &'a watch::Sender<bool>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::SeqCst);
        self.loading.send_replace(false);
    }
}

impl OptimisticDispatcher {
    pub fn new(
        cache: Arc<ConversationCache>,
        client: Arc<dyn FollowupClient>,
        clock: Arc<dyn Clock>,
        user_id: Option<String>
    ) -> Self {
        let (loading, _) = watch::channel(false);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            cache,
            client,
            clock,
            user_id,
            in_flight: AtomicBool::new(false),
            loading,
            notices,
        }
    }

    pub fn cache(&self) -> &Arc<ConversationCache> {
        &self.cache
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.loading.subscribe()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }

    /// Whether `text` would be accepted right now.
    pub fn check(&self, text: &str) -> Result<(), Rejection> {
        if text.trim().is_empty() {
            return Err(Rejection::EmptyInput);
        }
        if self.in_flight.load(Ordering::SeqCst) {
            return Err(Rejection::InFlight);
        }
        Ok(())
    }

    /// Asks `text` as a follow-up question.
    ///
    /// The question is appended immediately; the answer is appended when it
    /// arrives. Remote failures become a [`Notice::AnswerFailed`] and are
    /// rolled back according to `policy`. Results that arrive after the
    /// conversation was switched, cleared or torn down are dropped.
    pub async fn submit_question(&self, text: &str, policy: RollbackPolicy) -> SubmitOutcome {
        if text.trim().is_empty() {
            debug!("Ignoring blank question");
            return SubmitOutcome::Rejected(Rejection::EmptyInput);
        }
        if self.in_flight.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            debug!("Ignoring question while another is in flight");
            return SubmitOutcome::Rejected(Rejection::InFlight);
        }
        let _guard = InFlightGuard { in_flight: &self.in_flight, loading: &self.loading };
        self.loading.send_replace(true);

        let generation = self.cache.generation();
        let history = self.cache.transcript().to_vec();
        let question = ChatMessage::user(text, self.clock.now_millis(), self.user_id.clone());
        self.cache.append(generation, question.clone());

        let request = FollowupRequest { question: text.to_string(), history };
        match self.client.ask_followup(request).await {
            Ok(answer) => {
                let reply = ChatMessage::assistant(answer, self.clock.now_millis());
                if self.cache.append(generation, reply.clone()) {
                    SubmitOutcome::Answered(reply)
                } else {
                    info!("Discarding answer for a conversation that is no longer active");
                    SubmitOutcome::Discarded
                }
            }
            Err(e) => {
                if self.cache.generation() != generation {
                    info!("Discarding failed answer for a conversation that is no longer active: {}", e);
                    return SubmitOutcome::Discarded;
                }
                warn!("Follow-up question failed: {}", e);
                self.notify(Notice::AnswerFailed {
                    message: format!("Failed to get an answer: {}", e),
                });
                let rolled_back = match policy {
                    RollbackPolicy::RetainOptimistic => false,
                    RollbackPolicy::RemoveOptimistic => self.cache.retract(generation, &question),
                };
                SubmitOutcome::Failed { error: e.to_string(), rolled_back }
            }
        }
    }

    /// Fire-and-forget form of [`submit_question`](Self::submit_question).
    pub fn spawn_submit(
        self: &Arc<Self>,
        text: impl Into<String>,
        policy: RollbackPolicy
    ) -> JoinHandle<SubmitOutcome> {
        let dispatcher = self.clone();
        let text = text.into();
        tokio::spawn(async move { dispatcher.submit_question(&text, policy).await })
    }
}
