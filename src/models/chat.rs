use serde::{ Serialize, Deserialize };
use std::fmt;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of a follow-up conversation. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>, timestamp: i64, user_id: Option<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            timestamp,
            user_id,
        }
    }

    pub fn assistant(text: impl Into<String>, timestamp: i64) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            timestamp,
            user_id: None,
        }
    }
}

/// Identifies the chat thread attached to one explanation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// An immutable, shareable transcript snapshot.
///
/// Every mutation of a conversation produces a new `Transcript`, so two
/// snapshots are the *same* transcript exactly when they share an
/// allocation. Views use [`Transcript::same_as`] to decide whether to reseed.
#[derive(Clone, Debug, Default)]
pub struct Transcript(Arc<Vec<ChatMessage>>);

impl Transcript {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self(Arc::new(messages))
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn same_as(&self, other: &Transcript) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns a new transcript with `message` appended.
    pub fn appended(&self, message: ChatMessage) -> Transcript {
        let mut messages = Vec::with_capacity(self.0.len() + 1);
        messages.extend_from_slice(&self.0);
        messages.push(message);
        Transcript::new(messages)
    }

    /// Returns a new transcript without the last message equal to `message`,
    /// or `None` when no such message exists.
    pub fn without_last(&self, message: &ChatMessage) -> Option<Transcript> {
        let index = self.0.iter().rposition(|m| m == message)?;
        let mut messages = self.0.to_vec();
        messages.remove(index);
        Some(Transcript::new(messages))
    }

    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.0.to_vec()
    }
}

impl PartialEq for Transcript {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appended_creates_new_identity() {
        let empty = Transcript::default();
        let one = empty.appended(ChatMessage::user("hi", 1, None));
        assert!(!one.same_as(&empty));
        assert!(one.same_as(&one.clone()));
        assert_eq!(empty.len(), 0);
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn without_last_removes_the_latest_match_only() {
        let question = ChatMessage::user("again?", 10, None);
        let transcript = Transcript::new(vec![
            question.clone(),
            ChatMessage::assistant("yes", 11),
            question.clone(),
        ]);
        let trimmed = transcript.without_last(&question).expect("message present");
        assert_eq!(trimmed.messages(), &[question.clone(), ChatMessage::assistant("yes", 11)]);
        assert!(Transcript::default().without_last(&question).is_none());
    }

    #[test]
    fn message_serializes_with_camel_case_fields() {
        let message = ChatMessage::user("q", 5, Some("u-1".into()));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["userId"], "u-1");
        let assistant = serde_json::to_value(ChatMessage::assistant("a", 6)).unwrap();
        assert!(assistant.get("userId").is_none());
    }
}
