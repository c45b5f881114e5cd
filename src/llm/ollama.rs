use async_trait::async_trait;
use log::debug;
use reqwest::Client as HttpClient;
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use super::{ build_turns, ChatTurn, FollowupClient, FollowupRequest, LlmConfig, LlmType };

#[derive(Debug)]
pub struct OllamaFollowupClient {
    http: HttpClient,
    base_url: String,
    model: String,
    system_prompt: Option<String>,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatTurn>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatTurn,
}

impl OllamaFollowupClient {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| "cogito:3b".to_string());
        let url = base_url.unwrap_or_else(|| "http://localhost:11434".into());

        Self {
            http: HttpClient::new(),
            base_url: url,
            model,
            system_prompt: None,
        }
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if config.llm_type != LlmType::Ollama {
            return Err("Invalid config type for OllamaFollowupClient".into());
        }
        let mut client = Self::new(config.base_url.clone(), config.model.clone());
        client.system_prompt = config.system_prompt.clone();
        Ok(client)
    }
}

#[async_trait]
impl FollowupClient for OllamaFollowupClient {
    async fn ask_followup(
        &self,
        request: FollowupRequest
    ) -> Result<String, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let req = ChatRequest {
            model: self.model.clone(),
            messages: build_turns(self.system_prompt.as_deref(), &request),
            stream: false,
        };
        debug!("Asking Ollama model {} with {} history turns", self.model, request.history.len());
        let resp = self.http.post(&url).json(&req).send().await?.error_for_status()?;
        let data = resp.json::<ChatResponse>().await?;
        let answer = data.message.content.trim().to_string();
        if answer.is_empty() {
            return Err("Ollama returned an empty answer".into());
        }
        Ok(answer)
    }
}
