//! Gemini API client
//!
//! Uses a long-lived reqwest::Client for connection pooling.
//! With search grounding enabled the model can consult Google Search,
//! which is what the web-search stage relies on.

use crate::error::OrchestrationError;
use crate::llm::TextGenerator;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
    search_grounding: bool,
}

impl GeminiClient {
    pub fn new(api_key: String, model: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: model.to_string(),
            temperature: 0.1,
            max_output_tokens: 2048,
            search_grounding: false,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn with_search_grounding(mut self, enabled: bool) -> Self {
        self.search_grounding = enabled;
        self
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: self.max_output_tokens,
            },
            tools: self
                .search_grounding
                .then(|| vec![Tool { google_search: serde_json::json!({}) }]),
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(OrchestrationError::ConfigError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let request = self.build_request(prompt);

        debug!(model = %self.model, grounded = self.search_grounding, "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                OrchestrationError::GenerationError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(OrchestrationError::GenerationError(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            OrchestrationError::GenerationError(format!("Gemini parse error: {}", e))
        })?;

        extract_text(gemini_response)
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GeminiResponse) -> Result<String> {
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        OrchestrationError::GenerationError("No response from Gemini API".to_string())
    })?;

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        return Err(OrchestrationError::GenerationError(format!(
            "Empty response from Gemini (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}
