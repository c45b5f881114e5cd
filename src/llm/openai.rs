use async_trait::async_trait;
use log::debug;
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE } };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use super::{ build_turns, ChatTurn, FollowupClient, FollowupRequest, LlmConfig, LlmType };

/// Client for OpenAI and the providers that expose the same chat
/// completions endpoint (DeepSeek, xAI, Groq).
pub struct OpenAIFollowupClient {
    http: HttpClient,
    api_key: String,
    model: String,
    endpoint: String,
    system_prompt: Option<String>,
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatTurn>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChatTurn,
}

fn defaults_for(llm_type: &LlmType) -> (&'static str, &'static str) {
    match llm_type {
        LlmType::DeepSeek => ("https://api.deepseek.com/chat/completions", "deepseek-chat"),
        LlmType::XAI => ("https://api.x.ai/v1/chat/completions", "grok-3-latest"),
        LlmType::Groq => ("https://api.groq.com/openai/v1/chat/completions", "llama-3.1-8b-instant"),
        _ => ("https://api.openai.com/v1/chat/completions", "gpt-4o"),
    }
}

impl OpenAIFollowupClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        if config.llm_type == LlmType::Ollama {
            return Err("Invalid config type for OpenAIFollowupClient".into());
        }
        let api_key = config.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| format!("An API key is required for {:?}", config.llm_type))?;
        let (endpoint, model) = defaults_for(&config.llm_type);

        Ok(Self {
            http: HttpClient::new(),
            api_key,
            model: config.model.clone().unwrap_or_else(|| model.to_string()),
            endpoint: config.base_url.clone().unwrap_or_else(|| endpoint.to_string()),
            system_prompt: config.system_prompt.clone(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, Box<dyn StdError + Send + Sync>> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", self.api_key))?);
        Ok(headers)
    }
}

#[async_trait]
impl FollowupClient for OpenAIFollowupClient {
    async fn ask_followup(
        &self,
        request: FollowupRequest
    ) -> Result<String, Box<dyn StdError + Send + Sync>> {
        let req = ChatCompletionRequest {
            model: self.model.clone(),
            messages: build_turns(self.system_prompt.as_deref(), &request),
            temperature: 0.3,
        };
        debug!("Asking {} with {} history turns", self.model, request.history.len());
        let resp = self.http
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(&req)
            .send().await?
            .error_for_status()?;
        let data = resp.json::<ChatCompletionResponse>().await?;
        let answer = data.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .unwrap_or_default();
        if answer.is_empty() {
            return Err("Chat completion returned no answer".into());
        }
        Ok(answer)
    }
}
