// src/integrations/llm/client.rs
//
// Text-generation collaborator
//
// One prompt in, one completion out. The HTTP implementation speaks the
// OpenAI-compatible chat-completions protocol; tests substitute the mock.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};

use crate::config::LlmSettings;
use crate::error::{AppError, AppResult};
use crate::integrations::http::{build_http_client, join_url};

const SYSTEM_PROMPT: &str =
    "You are a bibliographic assistant. Answer with a single JSON object and nothing else.";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str) -> AppResult<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client
pub struct OpenAiCompatibleClient {
    base_url: String,
    api_key: String,
    model: String,
    http_client: Client,
}

impl OpenAiCompatibleClient {
    /// Fails when no API key is configured
    pub fn new(settings: &LlmSettings) -> AppResult<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AppError::Config("LLM api_key is not configured".to_string()))?;

        Ok(Self {
            base_url: settings.base_url.clone(),
            api_key,
            model: settings.model.clone(),
            http_client: build_http_client(settings.timeout_secs)?,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleClient {
    async fn complete(&self, prompt: &str) -> AppResult<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.0,
        };

        let response = self
            .http_client
            .post(join_url(&self.base_url, "chat/completions"))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Other(format!(
                "LLM API returned status: {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&response.text().await?)?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Other("LLM API returned no completion".to_string()))
    }
}
