pub mod chat;
pub mod envelope;

pub use chat::{ ChatMessage, ConversationId, Role, Transcript };
pub use envelope::StorageEnvelope;
