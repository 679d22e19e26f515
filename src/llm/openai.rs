//! OpenAI-compatible chat completions client
//!
//! Serves both OpenAI and OpenRouter; only the base URL and model differ.

use crate::error::OrchestrationError;
use crate::llm::TextGenerator;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

pub struct OpenAiCompatibleClient {
    client: Client,
    name: String,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiCompatibleClient {
    pub fn new(name: &str, api_key: String, base_url: &str, model: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            name: name.to_string(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature: 0.1,
            max_tokens: 2048,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(provider = %self.name, model = %self.model, "Calling chat completions");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await
            .map_err(|e| {
                error!(provider = %self.name, "Chat completion request failed: {}", e);
                OrchestrationError::GenerationError(format!("{} API error: {}", self.name, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(provider = %self.name, %status, "Chat completion error response: {}", error_text);
            return Err(OrchestrationError::GenerationError(format!(
                "{} API returned {}: {}",
                self.name, status, error_text
            )));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            OrchestrationError::GenerationError(format!("{} parse error: {}", self.name, e))
        })?;

        first_choice_text(body, &self.name)
    }
}

fn first_choice_text(body: ChatResponse, provider: &str) -> Result<String> {
    body.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| {
            OrchestrationError::GenerationError(format!("Empty response from {}", provider))
        })
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
