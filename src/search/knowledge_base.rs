//! Weaviate-backed regulatory knowledge base
//!
//! Issues a hybrid (keyword + vector) GraphQL query and maps each hit to a
//! `Passage`. Hits keep the order Weaviate ranked them in.

use crate::config::KnowledgeBaseSettings;
use crate::error::OrchestrationError;
use crate::models::Passage;
use crate::search::SearchProvider;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_RESULT_LIMIT: usize = 10;

#[derive(Clone)]
pub struct KnowledgeBaseClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
    title_property: String,
    text_property: String,
    limit: usize,
}

impl KnowledgeBaseClient {
    pub fn new(settings: &KnowledgeBaseSettings) -> Result<Self> {
        for (what, name) in [
            ("collection", &settings.collection),
            ("title property", &settings.title_property),
            ("text property", &settings.text_property),
        ] {
            if !is_graphql_name(name) {
                return Err(OrchestrationError::ConfigError(format!(
                    "invalid knowledge base {}: {:?}",
                    what, name
                )));
            }
        }

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            collection: settings.collection.clone(),
            title_property: settings.title_property.clone(),
            text_property: settings.text_property.clone(),
            limit: DEFAULT_RESULT_LIMIT,
        })
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }

    fn build_query(&self, query: &str) -> Result<String> {
        // JSON string escaping is valid GraphQL string escaping
        let literal = serde_json::to_string(query)?;
        Ok(format!(
            "{{ Get {{ {collection}(hybrid: {{ query: {literal} }}, limit: {limit}) {{ {title} {text} _additional {{ score }} }} }} }}",
            collection = self.collection,
            literal = literal,
            limit = self.limit,
            title = self.title_property,
            text = self.text_property,
        ))
    }

    fn parse_response(&self, body: &Value) -> Result<Vec<Passage>> {
        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages: Vec<&str> = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect();
                return Err(OrchestrationError::SearchError(format!(
                    "knowledge base query failed: {}",
                    messages.join("; ")
                )));
            }
        }

        let hits = body
            .get("data")
            .and_then(|d| d.get("Get"))
            .and_then(|g| g.get(&self.collection))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                OrchestrationError::SearchError(format!(
                    "knowledge base response has no results for collection {}",
                    self.collection
                ))
            })?;

        let passages = hits
            .iter()
            .map(|hit| Passage {
                title: hit
                    .get(&self.title_property)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                text: hit
                    .get(&self.text_property)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                score: hit
                    .get("_additional")
                    .and_then(|a| a.get("score"))
                    .and_then(parse_score)
                    .unwrap_or(0.0),
            })
            .collect();

        Ok(passages)
    }
}

#[async_trait]
impl SearchProvider for KnowledgeBaseClient {
    async fn search(&self, query: &str) -> Result<Vec<Passage>> {
        let url = format!("{}/v1/graphql", self.base_url);
        let body = json!({ "query": self.build_query(query)? });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            OrchestrationError::SearchError(format!("knowledge base request failed: {}", e))
        })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            OrchestrationError::SearchError(format!("invalid knowledge base response: {}", e))
        })?;

        if !status.is_success() {
            warn!(%status, "Knowledge base returned an error status");
            return Err(OrchestrationError::SearchError(format!(
                "knowledge base returned {}: {}",
                status, body
            )));
        }

        let passages = self.parse_response(&body)?;
        debug!(hits = passages.len(), "Knowledge base search complete");
        Ok(passages)
    }
}

/// Weaviate reports hybrid scores as strings
fn parse_score(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn is_graphql_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
