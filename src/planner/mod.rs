//! Query planning
//!
//! Turns a client situation into two independent query sets: short
//! knowledge-base queries and natural-language web queries. Planning never
//! fails; a generator error or an unusable reply falls back to a
//! deterministic query.

use crate::llm::TextGenerator;
use crate::models::{ClientSituation, SearchQuery};
use crate::prompts;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

pub mod fallback;

pub const MAX_REGULATORY_QUERIES: usize = 3;
pub const MAX_WEB_QUERIES: usize = 2;

/// Both query groups, in the order they will be searched and reported
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryPlan {
    pub regulatory: Vec<SearchQuery>,
    pub web: Vec<SearchQuery>,
}

pub struct QueryPlanner {
    generator: Arc<dyn TextGenerator>,
}

impl QueryPlanner {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Plan both groups concurrently
    pub async fn plan(&self, situation: &ClientSituation) -> QueryPlan {
        let (regulatory, web) = tokio::join!(
            self.plan_regulatory_queries(situation),
            self.plan_web_queries(situation),
        );

        QueryPlan { regulatory, web }
    }

    /// 1..=3 knowledge-base queries
    pub async fn plan_regulatory_queries(&self, situation: &ClientSituation) -> Vec<SearchQuery> {
        let prompt = prompts::regulatory_queries(situation.as_str());
        let queries = self
            .generate_queries(&prompt, MAX_REGULATORY_QUERIES, "regulatory")
            .await
            .unwrap_or_else(|| vec![fallback::regulatory_query(situation.as_str())]);

        debug!(?queries, "Regulatory queries planned");
        queries.into_iter().map(SearchQuery::regulatory).collect()
    }

    /// 1..=2 web queries
    pub async fn plan_web_queries(&self, situation: &ClientSituation) -> Vec<SearchQuery> {
        let prompt = prompts::web_queries(situation.as_str());
        let queries = self
            .generate_queries(&prompt, MAX_WEB_QUERIES, "web")
            .await
            .unwrap_or_else(|| vec![fallback::web_query(situation.as_str())]);

        debug!(?queries, "Web queries planned");
        queries.into_iter().map(SearchQuery::web).collect()
    }

    /// `None` means the caller should fall back
    async fn generate_queries(&self, prompt: &str, max: usize, group: &str) -> Option<Vec<String>> {
        match self.generator.generate(prompt).await {
            Ok(response) => {
                let queries = parse_queries(&response, max);
                if queries.is_empty() {
                    warn!(group, "Query planner returned no usable queries, using fallback");
                    None
                } else {
                    Some(queries)
                }
            }
            Err(e) => {
                warn!(group, error = %e, "Query generation failed, using fallback");
                None
            }
        }
    }
}

/// Accepts one query per line or a JSON array of strings (optionally fenced).
/// Numbering, bullets and quotes are stripped; duplicates are dropped.
pub fn parse_queries(response: &str, max: usize) -> Vec<String> {
    let cleaned = response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let candidates: Vec<String> = match serde_json::from_str::<Vec<String>>(cleaned) {
        Ok(list) => list,
        Err(_) => cleaned.lines().map(str::to_string).collect(),
    };

    let mut queries: Vec<String> = Vec::with_capacity(max);
    for candidate in candidates {
        let query = clean_query_line(&candidate);
        if query.is_empty() {
            continue;
        }
        if queries.iter().any(|q| q.eq_ignore_ascii_case(&query)) {
            continue;
        }
        queries.push(query);
        if queries.len() == max {
            break;
        }
    }

    queries
}

fn clean_query_line(line: &str) -> String {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();

    // "1." / "2)" list numbering, but not a figure such as "1.5%"
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    let mut rest = line[digits..].chars();
    let numbered = digits > 0
        && matches!(rest.next(), Some('.') | Some(')'))
        && rest.next().map_or(true, char::is_whitespace);
    let line = if numbered {
        line[digits + 1..].trim_start()
    } else {
        line
    };

    line.trim_matches(|c: char| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingGenerator, ScriptedGenerator};

    fn situation(text: &str) -> ClientSituation {
        ClientSituation::parse(text).unwrap()
    }

    #[test]
    fn test_parse_plain_lines() {
        let queries = parse_queries("RRSP contribution limits\n\n  spousal RRSP rules  \n", 3);
        assert_eq!(queries, vec!["RRSP contribution limits", "spousal RRSP rules"]);
    }

    #[test]
    fn test_parse_strips_numbering_and_caps() {
        let response = "1. RRSP contribution limits\n2) \"spousal RRSP rules\"\n- pension income splitting\n* RRIF withdrawals";
        let queries = parse_queries(response, 3);
        assert_eq!(
            queries,
            vec!["RRSP contribution limits", "spousal RRSP rules", "pension income splitting"]
        );
    }

    #[test]
    fn test_parse_json_array_and_dedupe() {
        let response = "```json\n[\"TFSA contribution rules\", \"tfsa contribution rules\", \"TFSA withdrawals\"]\n```";
        let queries = parse_queries(response, 3);
        assert_eq!(queries, vec!["TFSA contribution rules", "TFSA withdrawals"]);
    }

    #[test]
    fn test_parse_keeps_leading_decimal_figures() {
        assert_eq!(
            parse_queries("1.5% RRSP over-contribution penalty\n2. spousal RRSP", 3),
            vec!["1.5% RRSP over-contribution penalty", "spousal RRSP"]
        );
        assert_eq!(parse_queries("3)\n4. TFSA limit", 3), vec!["TFSA limit"]);
    }

    #[test]
    fn test_parse_keeps_leading_year() {
        assert_eq!(parse_queries("2025 TFSA limit Canada", 2), vec!["2025 TFSA limit Canada"]);
    }

    #[tokio::test]
    async fn test_plan_uses_generator_output() {
        let generator = Arc::new(ScriptedGenerator::new(|prompt: &str| {
            if prompt.contains("CRA regulatory documents") {
                Ok("RRSP investment rules\nqualified investments RRSP".to_string())
            } else {
                Ok("RRSP ETF options Canada 2025".to_string())
            }
        }));
        let planner = QueryPlanner::new(generator.clone());

        let plan = planner.plan(&situation("RRSP funds sitting in savings")).await;

        assert_eq!(
            plan.regulatory,
            vec![
                SearchQuery::regulatory("RRSP investment rules"),
                SearchQuery::regulatory("qualified investments RRSP"),
            ]
        );
        assert_eq!(plan.web, vec![SearchQuery::web("RRSP ETF options Canada 2025")]);
        assert_eq!(generator.call_count(), 2);
    }

    #[tokio::test]
    async fn test_plan_falls_back_when_generator_fails() {
        let planner = QueryPlanner::new(Arc::new(FailingGenerator::new("gemini")));

        let plan = planner
            .plan(&situation("Michael has $43,000 TFSA room and wants advice"))
            .await;

        assert_eq!(plan.regulatory, vec![SearchQuery::regulatory("TFSA contribution rules")]);
        assert_eq!(plan.web.len(), 1);
        assert!(plan.web[0].text.starts_with("Canada financial regulations"));
        assert!(plan.web[0].text.ends_with("Michael has $43,000 TFSA room and wants advice"));
    }

    #[tokio::test]
    async fn test_plan_falls_back_on_blank_reply() {
        let planner = QueryPlanner::new(Arc::new(ScriptedGenerator::constant("  \n```\n```  ")));

        let regulatory = planner
            .plan_regulatory_queries(&situation("Estate planning question"))
            .await;
        assert_eq!(regulatory, vec![SearchQuery::regulatory(fallback::DEFAULT_REGULATORY_QUERY)]);
    }
}
