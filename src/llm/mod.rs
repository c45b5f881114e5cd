pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use crate::models::ChatMessage;
use self::ollama::OllamaFollowupClient;
use self::openai::OpenAIFollowupClient;

/// Payload of a follow-up question about an explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowupRequest {
    pub question: String,
    /// The conversation as it stood before `question` was asked.
    pub history: Vec<ChatMessage>,
}

/// The remote "answer" call. Implementations own their own timeouts.
#[async_trait]
pub trait FollowupClient: Send + Sync {
    async fn ask_followup(
        &self,
        request: FollowupRequest
    ) -> Result<String, Box<dyn StdError + Send + Sync>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmType {
    Ollama,
    OpenAI,
    DeepSeek,
    XAI,
    Groq,
}

#[derive(Debug, PartialEq, Eq, Error)]
#[error("Invalid LLM type: '{0}'")]
pub struct ParseLlmTypeError(String);

impl FromStr for LlmType {
    type Err = ParseLlmTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(LlmType::Ollama),
            "openai" => Ok(LlmType::OpenAI),
            "deepseek" => Ok(LlmType::DeepSeek),
            "xai" => Ok(LlmType::XAI),
            "groq" => Ok(LlmType::Groq),
            _ => Err(ParseLlmTypeError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub llm_type: LlmType,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub system_prompt: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            llm_type: LlmType::Ollama,
            api_key: None,
            model: None,
            base_url: None,
            system_prompt: None,
        }
    }
}

/// A chat turn in the `{role, content}` shape both providers accept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// Lays out the system prompt, the history and the new question as chat
/// turns, oldest first.
pub fn build_turns(system_prompt: Option<&str>, request: &FollowupRequest) -> Vec<ChatTurn> {
    let mut turns = Vec::with_capacity(request.history.len() + 2);
    if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
        turns.push(ChatTurn { role: "system".to_string(), content: prompt.to_string() });
    }
    for message in &request.history {
        turns.push(ChatTurn {
            role: message.role.as_str().to_string(),
            content: message.text.clone(),
        });
    }
    turns.push(ChatTurn { role: "user".to_string(), content: request.question.clone() });
    turns
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn FollowupClient>, Box<dyn StdError + Send + Sync>> {
    let client: Arc<dyn FollowupClient> = match config.llm_type {
        LlmType::Ollama => Arc::new(OllamaFollowupClient::from_config(config)?),
        LlmType::OpenAI | LlmType::DeepSeek | LlmType::XAI | LlmType::Groq => {
            Arc::new(OpenAIFollowupClient::from_config(config)?)
        }
    };
    Ok(client)
}
