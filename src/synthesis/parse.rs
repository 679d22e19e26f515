//! Defensive parsing of the synthesis reply
//!
//! Models wrap JSON in prose or code fences and are loose about field types.
//! Extraction finds the JSON object; coercion maps whatever shape came back
//! onto the typed document, once, here.

use crate::error::OrchestrationError;
use crate::models::{FinalRecommendation, ReferenceDocument, RegulatoryItem, WebFinding};
use crate::Result;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

const PREVIEW_CHARS: usize = 200;

/// A fenced block opening exactly at the start of the haystack
fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)\A```(?i:json)?\s*(.*?)\s*```").expect("fence pattern is valid")
    })
}

/// Contents of the block opened at every backtick fence, in order. Every
/// fence is tried as an opener, so a stray fence in prose cannot pair up
/// with the opener of the real block.
fn fenced_blocks(raw: &str) -> impl Iterator<Item = &str> + '_ {
    raw.match_indices("```").filter_map(move |(start, _)| {
        fence_pattern()
            .captures(&raw[start..])
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str())
    })
}

/// Whole reply first, then each fenced block in order.
/// The first candidate that parses as a JSON object wins.
pub fn extract_json(raw: &str) -> Result<Map<String, Value>> {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw.trim()) {
        return Ok(map);
    }

    for block in fenced_blocks(raw) {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(block) {
            return Ok(map);
        }
    }

    Err(OrchestrationError::SynthesisParseError {
        preview: raw.chars().take(PREVIEW_CHARS).collect(),
    })
}

/// Map a loosely-typed JSON object onto `ReferenceDocument`. Unknown keys are ignored.
pub fn coerce_document(map: &Map<String, Value>) -> ReferenceDocument {
    ReferenceDocument {
        regulatory_overview: list(map.get("regulatory_overview"))
            .iter()
            .filter_map(regulatory_item)
            .collect(),
        web_findings: list(map.get("web_findings"))
            .iter()
            .filter_map(web_finding)
            .collect(),
        final_recommendation: map.get("final_recommendation").and_then(recommendation),
        current_numbers: numbers(map.get("current_numbers")),
        source_references: strings(map.get("source_references")),
        advisor_notes: strings(map.get("advisor_notes")),
        error: None,
        raw_response: None,
    }
}

fn regulatory_item(value: &Value) -> Option<RegulatoryItem> {
    match value {
        Value::Object(obj) => {
            let item = RegulatoryItem {
                regulation: field(obj, &["regulation", "rule", "title"]),
                source: field(obj, &["source", "chapter"]),
                details: field(obj, &["details", "description", "summary"]),
            };
            (item != RegulatoryItem::default()).then_some(item)
        }
        other => text(other).map(|regulation| RegulatoryItem {
            regulation: Some(regulation),
            ..RegulatoryItem::default()
        }),
    }
}

fn web_finding(value: &Value) -> Option<WebFinding> {
    match value {
        Value::Object(obj) => {
            let finding = WebFinding {
                finding: field(obj, &["finding", "summary"]),
                source_url: field(obj, &["source_url", "source", "url"]),
                relevance: field(obj, &["relevance"]),
            };
            (finding != WebFinding::default()).then_some(finding)
        }
        other => text(other).map(|finding| WebFinding {
            finding: Some(finding),
            ..WebFinding::default()
        }),
    }
}

fn recommendation(value: &Value) -> Option<FinalRecommendation> {
    match value {
        Value::Object(obj) => Some(FinalRecommendation {
            answer: field(obj, &["answer"]),
            reasoning: field(obj, &["reasoning"]),
            next_steps: strings(obj.get("next_steps")),
        }),
        other => text(other).map(|answer| FinalRecommendation {
            answer: Some(answer),
            ..FinalRecommendation::default()
        }),
    }
}

/// Figure name to value; entries with no usable value are dropped
fn numbers(value: Option<&Value>) -> BTreeMap<String, String> {
    match value {
        Some(Value::Object(obj)) => obj
            .iter()
            .filter_map(|(name, v)| text(v).map(|v| (name.trim().to_string(), v)))
            .filter(|(name, _)| !name.is_empty())
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// First non-empty value among the candidate keys
fn field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| obj.get(*key).and_then(text))
}

/// Scalars as text, nested values as compact JSON, null and blanks as `None`
fn text(value: &Value) -> Option<String> {
    let rendered = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    };
    (!rendered.is_empty()).then_some(rendered)
}

/// A list, or a single value treated as a one-element list
fn list(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

fn strings(value: Option<&Value>) -> Vec<String> {
    list(value).iter().filter_map(text).collect()
}
