//! Text generation providers
//!
//! `TextGenerator` is the only capability the pipeline needs from an LLM:
//! prompt in, text out. Concrete clients live in the submodules and are
//! chained with `FallbackGenerator`.

use crate::config::Settings;
use crate::error::OrchestrationError;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod gemini;
pub mod openai;

pub use gemini::GeminiClient;
pub use openai::OpenAiCompatibleClient;

/// Trait for free-text completion (may fail, may return malformed output)
#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Ordered list of generators tried in sequence until one succeeds
pub struct FallbackGenerator {
    generators: Vec<Arc<dyn TextGenerator>>,
    name: String,
}

impl FallbackGenerator {
    pub fn new(generators: Vec<Arc<dyn TextGenerator>>) -> Self {
        let name = generators
            .iter()
            .map(|g| g.name())
            .collect::<Vec<_>>()
            .join(" -> ");

        Self { generators, name }
    }

    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

#[async_trait]
impl TextGenerator for FallbackGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut last_error = None;

        for generator in &self.generators {
            match generator.generate(prompt).await {
                Ok(text) => {
                    debug!(provider = generator.name(), "Generation succeeded");
                    return Ok(text);
                }
                Err(e) => {
                    warn!(provider = generator.name(), error = %e, "Provider failed, trying next");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            OrchestrationError::GenerationError("No text generation providers configured".to_string())
        }))
    }
}

/// Build the configured provider chain: primary first, then fallbacks.
///
/// Providers without an API key are skipped.
pub fn build_generator(settings: &Settings) -> Result<FallbackGenerator> {
    build_chain(settings, false)
}

/// Same chain as [`build_generator`], with Gemini search grounding enabled
/// so the web-search stage can reach current information.
pub fn build_web_generator(settings: &Settings) -> Result<FallbackGenerator> {
    build_chain(settings, true)
}

fn build_chain(settings: &Settings, grounded: bool) -> Result<FallbackGenerator> {
    let mut generators: Vec<Arc<dyn TextGenerator>> = Vec::new();

    for name in settings.provider_order() {
        match build_provider(settings, &name, grounded)? {
            Some(provider) => generators.push(provider),
            None => warn!(provider = %name, "Provider unavailable, skipping"),
        }
    }

    if generators.is_empty() {
        return Err(OrchestrationError::ConfigError(
            "No LLM provider available: set GEMINI_API_KEY, OPENAI_API_KEY or OPENROUTER_API_KEY".to_string(),
        ));
    }

    let chain = FallbackGenerator::new(generators);
    info!(chain = chain.name(), grounded, "Text generation chain ready");
    Ok(chain)
}

/// `None` when the provider has no API key or is not a known name
fn build_provider(
    settings: &Settings,
    name: &str,
    grounded: bool,
) -> Result<Option<Arc<dyn TextGenerator>>> {
    let provider: Arc<dyn TextGenerator> = match name {
        "gemini" => {
            let Some(key) = &settings.gemini.api_key else {
                return Ok(None);
            };
            Arc::new(
                GeminiClient::new(key.clone(), &settings.gemini.model)?
                    .with_base_url(&settings.gemini.base_url)
                    .with_temperature(settings.temperature)
                    .with_max_output_tokens(settings.max_tokens)
                    .with_search_grounding(grounded),
            )
        }
        "openai" | "openrouter" => {
            let config = if name == "openai" {
                &settings.openai
            } else {
                &settings.openrouter
            };
            let Some(key) = &config.api_key else {
                return Ok(None);
            };
            Arc::new(
                OpenAiCompatibleClient::new(name, key.clone(), &config.base_url, &config.model)?
                    .with_temperature(settings.temperature)
                    .with_max_tokens(settings.max_tokens),
            )
        }
        other => {
            warn!(provider = other, "Unknown LLM provider in configuration");
            return Ok(None);
        }
    };

    Ok(Some(provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingGenerator, ScriptedGenerator};

    #[tokio::test]
    async fn test_fallback_short_circuits_on_first_success() {
        let second = Arc::new(ScriptedGenerator::constant("second"));
        let third = Arc::new(ScriptedGenerator::constant("third"));
        let generators: Vec<Arc<dyn TextGenerator>> = vec![
            Arc::new(FailingGenerator::new("first")),
            second.clone(),
            third.clone(),
        ];
        let chain = FallbackGenerator::new(generators);

        let text = chain.generate("hello").await.unwrap();
        assert_eq!(text, "second");
        assert_eq!(second.call_count(), 1);
        assert_eq!(third.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fallback_returns_last_error_when_all_fail() {
        let generators: Vec<Arc<dyn TextGenerator>> = vec![
            Arc::new(FailingGenerator::new("a")),
            Arc::new(FailingGenerator::new("b")),
        ];
        let chain = FallbackGenerator::new(generators);

        let err = chain.generate("hello").await.unwrap_err();
        assert!(err.to_string().contains("b unavailable"));
    }

    #[test]
    fn test_empty_chain_errors() {
        let chain = FallbackGenerator::new(vec![]);
        assert!(chain.is_empty());
        let err = tokio_test::block_on(chain.generate("hello")).unwrap_err();
        assert!(matches!(err, OrchestrationError::GenerationError(_)));
    }

    #[test]
    fn test_build_generator_requires_a_key() {
        let settings = Settings::default();
        let err = build_generator(&settings).err().unwrap();
        assert!(matches!(err, OrchestrationError::ConfigError(_)));
    }

    #[test]
    fn test_build_generator_skips_providers_without_keys() {
        let mut settings = Settings::default();
        settings.fallback_providers = vec!["openai".to_string(), "openrouter".to_string()];
        settings.openrouter.api_key = Some("or-key".to_string());

        let chain = build_generator(&settings).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.name(), "openrouter");
    }
}
