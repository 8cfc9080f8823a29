//! Chat model delegate backed by the Ollama HTTP API.
//!
//! Uses `POST /api/chat` with streaming disabled; the answer is read from
//! `message.content`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ModelConfig;
use crate::error::ReviewError;

/// An opaque text-generation service.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn id(&self) -> &str;

    /// Run one system + user exchange and return the raw answer text.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ReviewError>;
}

#[derive(Clone)]
pub struct OllamaChat {
    base_url: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: AnswerMessage,
}

#[derive(Deserialize)]
struct AnswerMessage {
    #[serde(default)]
    content: String,
}

impl OllamaChat {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ReviewError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ReviewError::Upstream(format!("Failed to reach Ollama at {}: {}", self.base_url, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::Upstream(format!(
                "Ollama API error ({}): {}",
                status, body
            )));
        }

        let answer: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReviewError::Upstream(format!("Failed to parse Ollama response: {}", e)))?;

        debug!(model = %self.model, chars = answer.message.content.len(), "Model answered");
        Ok(answer.message.content)
    }
}
