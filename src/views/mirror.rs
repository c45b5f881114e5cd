use crate::models::{ ChatMessage, Transcript };

/// A surface's own copy of a transcript.
///
/// It only catches up with the shared transcript when it is reseeded, and
/// remembers which snapshot it was last seeded from.
#[derive(Debug, Clone, Default)]
pub struct TranscriptView {
    messages: Vec<ChatMessage>,
    seeded_from: Option<Transcript>,
}

impl TranscriptView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn is_seeded_from(&self, source: &Transcript) -> bool {
        self.seeded_from.as_ref().is_some_and(|seed| seed.same_as(source))
    }

    pub fn seed(&mut self, source: &Transcript) {
        self.messages = source.to_vec();
        self.seeded_from = Some(source.clone());
    }

    /// Reseeds when `source` is a different snapshot than the last seed.
    pub fn reseed_if_changed(&mut self, source: &Transcript) -> bool {
        if self.is_seeded_from(source) {
            return false;
        }
        self.seed(source);
        true
    }

    /// Records `source` as the latest seed without touching the local list.
    pub fn acknowledge(&mut self, source: &Transcript) {
        self.seeded_from = Some(source.clone());
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn retract(&mut self, message: &ChatMessage) -> bool {
        match self.messages.iter().rposition(|m| m == message) {
            Some(index) => {
                self.messages.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.seeded_from = None;
    }
}
