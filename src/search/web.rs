//! Web search through a search-capable text generator
//!
//! The model is asked to search and summarise; the summary is kept as-is and
//! source attributions are pulled out of it.

use crate::error::OrchestrationError;
use crate::llm::TextGenerator;
use crate::models::WebSearchResult;
use crate::prompts;
use crate::search::WebSearchProvider;
use crate::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

pub struct LlmWebSearch {
    generator: Arc<dyn TextGenerator>,
}

impl LlmWebSearch {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl WebSearchProvider for LlmWebSearch {
    async fn search(&self, query: &str) -> Result<WebSearchResult> {
        let summary = self.generator.generate(&prompts::web_search(query)).await?;
        let summary = summary.trim();

        if summary.is_empty() {
            return Err(OrchestrationError::SearchError(format!(
                "empty web search summary for: {}",
                query
            )));
        }

        let source_urls = extract_sources(summary);
        debug!(sources = source_urls.len(), "Web search summary received");

        Ok(WebSearchResult {
            query: query.to_string(),
            summary_text: summary.to_string(),
            source_urls,
        })
    }
}

fn url_pattern() -> &'static Regex {
    static URL: OnceLock<Regex> = OnceLock::new();
    URL.get_or_init(|| Regex::new(r#"https?://[^\s<>()\[\]"',]+"#).expect("URL pattern is valid"))
}

/// Links anywhere in the text, then entries of a trailing `Sources:` line.
/// Order of first appearance, no duplicates.
pub fn extract_sources(text: &str) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        let cleaned = candidate
            .trim()
            .trim_matches(|c: char| matches!(c, '[' | ']' | '.' | ';' | '*'))
            .trim();
        if !cleaned.is_empty() && !sources.iter().any(|s| s == cleaned) {
            sources.push(cleaned.to_string());
        }
    };

    for m in url_pattern().find_iter(text) {
        push(m.as_str());
    }

    for line in text.lines() {
        let line = line.trim().trim_start_matches(['*', '-']).trim();
        let rest = line
            .strip_prefix("Sources:")
            .or_else(|| line.strip_prefix("Source:"));
        if let Some(rest) = rest {
            for entry in rest.split(',') {
                let entry = entry.trim();
                // URLs were already collected above
                if !entry.starts_with("http") {
                    push(entry);
                }
            }
        }
    }

    sources
}
