//! Synthesis
//!
//! One generation call turns the research bundle into a `ReferenceDocument`.
//! Generation and parse failures come back as a failed document, never as an
//! error.

use crate::llm::TextGenerator;
use crate::models::{
    ClientSituation, ReferenceDocument, ResearchBundle, ResearchEntry, ResearchOutcome, SearchResult,
};
use crate::prompts;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{error, info};

pub mod parse;

pub use parse::{coerce_document, extract_json};

const SEPARATOR: &str = "\n\n---\n\n";
const RAW_RESPONSE_CHARS: usize = 500;

pub struct SynthesisEngine {
    generator: Arc<dyn TextGenerator>,
}

impl SynthesisEngine {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn synthesize(
        &self,
        situation: &ClientSituation,
        bundle: &ResearchBundle,
    ) -> ReferenceDocument {
        let prompt = build_prompt(situation, &bundle.regulatory, &bundle.web);

        let raw = match self.generator.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(generator = self.generator.name(), error = %e, "Synthesis generation failed");
                return ReferenceDocument::failed(e.to_string(), None);
            }
        };

        match extract_json(&raw) {
            Ok(map) => {
                let document = coerce_document(&map);
                info!(
                    regulatory_items = document.regulatory_overview.len(),
                    web_findings = document.web_findings.len(),
                    has_recommendation = document.final_recommendation.is_some(),
                    "Synthesis complete"
                );
                document
            }
            Err(e) => {
                error!(error = %e, "Synthesis reply was not valid JSON");
                let raw: String = raw.chars().take(RAW_RESPONSE_CHARS).collect();
                ReferenceDocument::failed(e.to_string(), Some(raw))
            }
        }
    }
}

pub fn build_prompt(
    situation: &ClientSituation,
    regulatory: &[ResearchEntry],
    web: &[ResearchEntry],
) -> String {
    let regulatory_text = format_entries(regulatory, "No CRA documents found");
    let web_text = format_entries(web, "No web results found");
    prompts::reference_synthesis(situation.as_str(), &regulatory_text, &web_text)
}

/// "Search N ('query'): <results>" blocks, joined by separators
fn format_entries(entries: &[ResearchEntry], empty: &str) -> String {
    if entries.is_empty() {
        return empty.to_string();
    }

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "Search {} ('{}'): {}",
                i + 1,
                entry.query.text,
                format_outcome(&entry.outcome)
            )
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

fn format_outcome(outcome: &ResearchOutcome) -> String {
    match outcome {
        ResearchOutcome::Failed { message } => message.clone(),
        ResearchOutcome::Found {
            result: SearchResult::Regulatory(result),
        } => {
            if result.passages.is_empty() {
                return "No CRA documents found".to_string();
            }
            let mut out = String::new();
            for (i, passage) in result.passages.iter().enumerate() {
                let title = if passage.title.trim().is_empty() {
                    "CRA Document"
                } else {
                    passage.title.as_str()
                };
                let _ = write!(out, "\n{}. {} (score {:.2}):\n{}", i + 1, title, passage.score, passage.text);
            }
            out
        }
        ResearchOutcome::Found {
            result: SearchResult::Web(result),
        } => {
            let mut out = format!("\n{}", result.summary_text);
            if !result.source_urls.is_empty() {
                let _ = write!(out, "\nSources: {}", result.source_urls.join(", "));
            }
            out
        }
    }
}
