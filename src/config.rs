//! Environment-driven configuration
//!
//! Values come from the process environment, after loading `.env` if present.

use crate::error::OrchestrationError;
use crate::models::MAX_SITUATION_CHARS;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Bounds applied to research results before synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResearchLimits {
    pub max_passages_per_query: usize,
    pub max_passage_chars: usize,
    /// Per-query deadline; `None` waits for the provider indefinitely
    pub query_timeout: Option<Duration>,
}

impl Default for ResearchLimits {
    fn default() -> Self {
        Self {
            max_passages_per_query: 5,
            max_passage_chars: 800,
            query_timeout: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBaseSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
    pub title_property: String,
    pub text_property: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub llm_provider: String,
    pub fallback_providers: Vec<String>,
    pub gemini: ProviderSettings,
    pub openai: ProviderSettings,
    pub openrouter: ProviderSettings,
    pub temperature: f32,
    pub max_tokens: u32,
    pub knowledge_base: KnowledgeBaseSettings,
    pub limits: ResearchLimits,
    pub max_situation_chars: usize,
    pub request_timeout: Duration,
    pub api_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            llm_provider: "gemini".to_string(),
            fallback_providers: vec!["openai".to_string()],
            gemini: ProviderSettings {
                api_key: None,
                model: "gemini-2.5-flash".to_string(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            },
            openai: ProviderSettings {
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
            },
            openrouter: ProviderSettings {
                api_key: None,
                model: "deepseek/deepseek-chat-v3-0324:free".to_string(),
                base_url: "https://openrouter.ai/api/v1".to_string(),
            },
            temperature: 0.1,
            max_tokens: 2048,
            knowledge_base: KnowledgeBaseSettings {
                url: "http://localhost:8080".to_string(),
                api_key: None,
                collection: "Rbc_2_cra_public_documents".to_string(),
                title_property: "title".to_string(),
                text_property: "text".to_string(),
            },
            limits: ResearchLimits::default(),
            max_situation_chars: MAX_SITUATION_CHARS,
            request_timeout: Duration::from_secs(180),
            api_port: 8080,
        }
    }
}

impl Settings {
    /// Load `.env` (if any) and read settings from the environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut settings = Settings::default();

        if let Some(provider) = get("LLM_PROVIDER") {
            settings.llm_provider = provider.to_lowercase();
        }
        if let Some(fallbacks) = get("LLM_FALLBACK_PROVIDERS") {
            settings.fallback_providers = fallbacks
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect();
        }

        settings.gemini.api_key = get("GEMINI_API_KEY");
        if let Some(model) = get("GEMINI_MODEL") {
            settings.gemini.model = model;
        }

        settings.openai.api_key = get("OPENAI_API_KEY");
        if let Some(model) = get("OPENAI_MODEL") {
            settings.openai.model = model;
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            settings.openai.base_url = url;
        }

        settings.openrouter.api_key = get("OPENROUTER_API_KEY");
        if let Some(model) = get("OPENROUTER_MODEL") {
            settings.openrouter.model = model;
        }

        if let Some(v) = get("LLM_TEMPERATURE") {
            settings.temperature = parse_value("LLM_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("LLM_MAX_TOKENS") {
            settings.max_tokens = parse_value("LLM_MAX_TOKENS", &v)?;
        }

        if let Some(url) = get("WEAVIATE_URL") {
            settings.knowledge_base.url = url;
        }
        settings.knowledge_base.api_key = get("WEAVIATE_API_KEY");
        if let Some(collection) = get("KB_COLLECTION") {
            settings.knowledge_base.collection = collection;
        }
        if let Some(prop) = get("KB_TITLE_PROPERTY") {
            settings.knowledge_base.title_property = prop;
        }
        if let Some(prop) = get("KB_TEXT_PROPERTY") {
            settings.knowledge_base.text_property = prop;
        }

        if let Some(v) = get("MAX_PASSAGES_PER_QUERY") {
            settings.limits.max_passages_per_query = parse_value("MAX_PASSAGES_PER_QUERY", &v)?;
        }
        if let Some(v) = get("MAX_PASSAGE_CHARS") {
            settings.limits.max_passage_chars = parse_value("MAX_PASSAGE_CHARS", &v)?;
        }
        if let Some(v) = get("QUERY_TIMEOUT_SECS") {
            let secs: u64 = parse_value("QUERY_TIMEOUT_SECS", &v)?;
            settings.limits.query_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECS") {
            settings.request_timeout = Duration::from_secs(parse_value("REQUEST_TIMEOUT_SECS", &v)?);
        }

        if let Some(v) = get("PORT").or_else(|| get("API_PORT")) {
            settings.api_port = parse_value("PORT", &v)?;
        }

        Ok(settings)
    }

    /// Primary provider followed by fallbacks, without duplicates
    pub fn provider_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::with_capacity(1 + self.fallback_providers.len());
        for name in std::iter::once(&self.llm_provider).chain(self.fallback_providers.iter()) {
            if !order.contains(name) {
                order.push(name.clone());
            }
        }
        order
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| {
        OrchestrationError::ConfigError(format!("invalid value for {}: {} ({})", key, value, e))
    })
}
