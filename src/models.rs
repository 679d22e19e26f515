//! Core data models for advisor reference generation

use crate::error::OrchestrationError;
use crate::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;

/// Longest accepted client situation, in characters
pub const MAX_SITUATION_CHARS: usize = 5000;

/// Placeholder rendered wherever a section or field is absent
pub const NO_DATA: &str = "No data available.";

//
// ================= Client Situation =================
//

/// Free-text description of a client's circumstances.
///
/// Construction validates the input, so a `ClientSituation` is always
/// non-blank and within the length bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClientSituation(String);

impl ClientSituation {
    pub fn parse(input: &str) -> Result<Self> {
        Self::parse_with_limit(input, MAX_SITUATION_CHARS)
    }

    pub fn parse_with_limit(input: &str, max_chars: usize) -> Result<Self> {
        if input.trim().is_empty() {
            return Err(OrchestrationError::ValidationError(
                "Please provide a client situation description.".to_string(),
            ));
        }

        let length = input.chars().count();
        if length > max_chars {
            return Err(OrchestrationError::ValidationError(format!(
                "Client situation description is too long ({} characters, max {}).",
                length, max_chars
            )));
        }

        Ok(Self(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short SHA-256 fingerprint used in logs in place of the raw text
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..6])
    }
}

impl fmt::Display for ClientSituation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ================= Queries =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Regulatory,
    Web,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    pub kind: QueryKind,
    pub text: String,
}

impl SearchQuery {
    pub fn regulatory(text: impl Into<String>) -> Self {
        Self {
            kind: QueryKind::Regulatory,
            text: text.into(),
        }
    }

    pub fn web(text: impl Into<String>) -> Self {
        Self {
            kind: QueryKind::Web,
            text: text.into(),
        }
    }
}

impl fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

//
// ================= Search Results =================
//

/// One ranked passage from the regulatory knowledge base
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passage {
    pub title: String,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegulatorySearchResult {
    pub query: String,
    pub passages: Vec<Passage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebSearchResult {
    pub query: String,
    pub summary_text: String,
    pub source_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchResult {
    Regulatory(RegulatorySearchResult),
    Web(WebSearchResult),
}

//
// ================= Research Bundle =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ResearchOutcome {
    Found { result: SearchResult },
    Failed { message: String },
}

/// A planned query together with what came back for it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchEntry {
    pub query: SearchQuery,
    pub outcome: ResearchOutcome,
}

impl ResearchEntry {
    pub fn found(query: SearchQuery, result: SearchResult) -> Self {
        Self {
            query,
            outcome: ResearchOutcome::Found { result },
        }
    }

    /// Error placeholder bound to the query that failed
    pub fn failed(query: SearchQuery) -> Self {
        let message = format!("search error for: {}", query.text);
        Self {
            query,
            outcome: ResearchOutcome::Failed { message },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, ResearchOutcome::Failed { .. })
    }
}

/// Everything retrieved for one client situation, in planned query order
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResearchBundle {
    pub regulatory: Vec<ResearchEntry>,
    pub web: Vec<ResearchEntry>,
}

impl ResearchBundle {
    pub fn entries(&self) -> impl Iterator<Item = &ResearchEntry> {
        self.regulatory.iter().chain(self.web.iter())
    }

    pub fn len(&self) -> usize {
        self.regulatory.len() + self.web.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn failure_count(&self) -> usize {
        self.entries().filter(|e| e.is_failure()).count()
    }
}

//
// ================= Reference Document =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RegulatoryItem {
    pub regulation: Option<String>,
    pub source: Option<String>,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WebFinding {
    pub finding: Option<String>,
    pub source_url: Option<String>,
    pub relevance: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FinalRecommendation {
    pub answer: Option<String>,
    pub reasoning: Option<String>,
    #[serde(default)]
    pub next_steps: Vec<String>,
}

/// Synthesised advisor reference material.
///
/// Every section may be empty. A failed synthesis is still a document:
/// `error` is set and `raw_response` holds the truncated model output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReferenceDocument {
    #[serde(default)]
    pub regulatory_overview: Vec<RegulatoryItem>,
    #[serde(default)]
    pub web_findings: Vec<WebFinding>,
    #[serde(default)]
    pub final_recommendation: Option<FinalRecommendation>,
    /// Latest limits, rates and deadlines, keyed by figure name
    #[serde(default)]
    pub current_numbers: BTreeMap<String, String>,
    #[serde(default)]
    pub source_references: Vec<String>,
    #[serde(default)]
    pub advisor_notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl ReferenceDocument {
    pub fn failed(error: impl Into<String>, raw_response: Option<String>) -> Self {
        Self {
            error: Some(error.into()),
            raw_response,
            ..Self::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Advisor-facing markdown. Absent data renders as a placeholder.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();

        if let Some(error) = &self.error {
            let _ = writeln!(out, "> Reference generation failed: {}\n", error);
        }

        out.push_str("## Regulatory Overview\n");
        if self.regulatory_overview.is_empty() {
            let _ = writeln!(out, "{}", NO_DATA);
        }
        for item in &self.regulatory_overview {
            let _ = writeln!(
                out,
                "- **{}** ({}): {}",
                or_placeholder(&item.regulation),
                or_placeholder(&item.source),
                or_placeholder(&item.details),
            );
        }

        out.push_str("\n## Web Findings\n");
        if self.web_findings.is_empty() {
            let _ = writeln!(out, "{}", NO_DATA);
        }
        for finding in &self.web_findings {
            let _ = writeln!(
                out,
                "- {} (source: {}; relevance: {})",
                or_placeholder(&finding.finding),
                or_placeholder(&finding.source_url),
                or_placeholder(&finding.relevance),
            );
        }

        out.push_str("\n## Current Numbers\n");
        if self.current_numbers.is_empty() {
            let _ = writeln!(out, "{}", NO_DATA);
        }
        for (name, value) in &self.current_numbers {
            let _ = writeln!(out, "- **{}:** {}", name, value);
        }

        out.push_str("\n## Final Recommendation\n");
        match &self.final_recommendation {
            None => {
                let _ = writeln!(out, "{}", NO_DATA);
            }
            Some(rec) => {
                let _ = writeln!(out, "**Answer:** {}\n", or_placeholder(&rec.answer));
                let _ = writeln!(out, "**Reasoning:** {}\n", or_placeholder(&rec.reasoning));
                out.push_str("**Next Steps:**\n");
                if rec.next_steps.is_empty() {
                    let _ = writeln!(out, "{}", NO_DATA);
                }
                for (i, step) in rec.next_steps.iter().enumerate() {
                    let _ = writeln!(out, "{}. {}", i + 1, step);
                }
            }
        }

        push_bullets(&mut out, "Sources", &self.source_references);
        push_bullets(&mut out, "Advisor Notes", &self.advisor_notes);

        out
    }
}

fn or_placeholder(value: &Option<String>) -> &str {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => v,
        _ => NO_DATA,
    }
}

fn push_bullets(out: &mut String, heading: &str, items: &[String]) {
    let _ = writeln!(out, "\n## {}", heading);
    if items.is_empty() {
        let _ = writeln!(out, "{}", NO_DATA);
    }
    for item in items {
        let _ = writeln!(out, "- {}", item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_situation_length_boundary() {
        let exact = "a".repeat(MAX_SITUATION_CHARS);
        assert!(ClientSituation::parse(&exact).is_ok());

        let over = "a".repeat(MAX_SITUATION_CHARS + 1);
        let err = ClientSituation::parse(&over).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_situation_counts_characters_not_bytes() {
        let accented = "é".repeat(MAX_SITUATION_CHARS);
        assert!(ClientSituation::parse(&accented).is_ok());
    }

    #[test]
    fn test_blank_situation_rejected() {
        for input in ["", "   ", "\n\t "] {
            let err = ClientSituation::parse(input).unwrap_err();
            assert!(err.is_validation(), "{:?} should be rejected", input);
        }
    }

    #[test]
    fn test_failed_entry_message_names_query() {
        let entry = ResearchEntry::failed(SearchQuery::regulatory("TFSA rules"));
        assert!(entry.is_failure());
        match entry.outcome {
            ResearchOutcome::Failed { message } => {
                assert_eq!(message, "search error for: TFSA rules")
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_empty_document_renders_placeholders() {
        let markdown = ReferenceDocument::default().to_markdown();
        assert_eq!(markdown.matches(NO_DATA).count(), 6);
        assert!(markdown.contains("## Current Numbers\nNo data available.\n"));
        assert!(!markdown.contains("failed"));
    }

    #[test]
    fn test_partial_item_renders_placeholder_fields() {
        let doc = ReferenceDocument {
            regulatory_overview: vec![RegulatoryItem {
                regulation: Some("RRSP deduction limit".to_string()),
                source: None,
                details: Some("18% of earned income".to_string()),
            }],
            ..ReferenceDocument::default()
        };

        let markdown = doc.to_markdown();
        assert!(markdown.contains("- **RRSP deduction limit** (No data available.): 18% of earned income"));
    }

    #[test]
    fn test_current_numbers_render_in_name_order() {
        let mut doc = ReferenceDocument::default();
        doc.current_numbers
            .insert("TFSA annual limit 2025".to_string(), "$7,000".to_string());
        doc.current_numbers
            .insert("RRSP deadline".to_string(), "March 3, 2025".to_string());

        let markdown = doc.to_markdown();
        assert!(markdown.contains(
            "## Current Numbers\n- **RRSP deadline:** March 3, 2025\n- **TFSA annual limit 2025:** $7,000\n"
        ));
        assert_eq!(markdown.matches(NO_DATA).count(), 5);
    }

    #[test]
    fn test_failed_document_serializes_error() {
        let doc = ReferenceDocument::failed("boom", Some("raw".to_string()));
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["error"], "boom");
        assert_eq!(json["raw_response"], "raw");
        assert_eq!(json["regulatory_overview"], serde_json::json!([]));
        assert_eq!(json["current_numbers"], serde_json::json!({}));
        assert!(doc.to_markdown().starts_with("> Reference generation failed: boom"));
    }
}
