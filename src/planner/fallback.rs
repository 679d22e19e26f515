//! Deterministic fallback queries
//!
//! Used whenever the text generator fails or returns nothing usable, so
//! planning always yields at least one query per group.

use chrono::{Datelike, Utc};

/// Account-type keywords and the canned regulatory query each selects.
/// First match wins.
const ACCOUNT_QUERIES: &[(&str, &str)] = &[
    ("RRSP", "RRSP contribution limits"),
    ("TFSA", "TFSA contribution rules"),
    ("RESP", "RESP contribution rules"),
    ("RRIF", "RRIF minimum withdrawals"),
];

pub const DEFAULT_REGULATORY_QUERY: &str = "tax regulations";

/// Characters of the situation carried into the fallback web query
const WEB_PREFIX_CHARS: usize = 50;

pub fn regulatory_query(situation: &str) -> String {
    let tokens: Vec<String> = situation
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_uppercase())
        .collect();

    // Whole words only ("RESPONSE" must not select RESP); plurals count
    let mentions = |keyword: &str| {
        tokens
            .iter()
            .any(|t| t == keyword || t.strip_suffix('S') == Some(keyword))
    };

    ACCOUNT_QUERIES
        .iter()
        .find(|(keyword, _)| mentions(keyword))
        .map(|(_, query)| query.to_string())
        .unwrap_or_else(|| DEFAULT_REGULATORY_QUERY.to_string())
}

pub fn web_query(situation: &str) -> String {
    let collapsed = situation.split_whitespace().collect::<Vec<_>>().join(" ");
    let prefix: String = collapsed.chars().take(WEB_PREFIX_CHARS).collect();

    format!(
        "Canada financial regulations {} {}",
        Utc::now().year(),
        prefix.trim_end()
    )
}
