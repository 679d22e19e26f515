//! Prompt templates for each generation call

/// Stage 1: knowledge-base query planning
pub fn regulatory_queries(client_situation: &str) -> String {
    format!(
        r#"Client situation: {}

Generate 1-3 search queries for CRA regulatory documents based on the topics mentioned.
Each query should be 2-4 words focusing on specific tax topics, account types, or regulations.
If only one topic is relevant, provide one query. If multiple topics, provide up to 3 queries.

Return each query on a new line, no explanations or numbering.
Example output for single topic:
RRSP contribution limits

Example output for multiple topics:
RRSP contribution limits
spousal RRSP rules
pension income splitting
"#,
        client_situation
    )
}

/// Stage 1: web query planning
pub fn web_queries(client_situation: &str) -> String {
    format!(
        r#"Client situation: {}

Generate 1-2 web search queries for current Canadian financial information based on the topics mentioned.
Each query should be natural language including "Canada" and relevant time period if mentioned.
If only one topic needs current info, provide one query. If multiple topics, provide up to 2 queries.

Return each query on a new line, no explanations or numbering.
Example output for single topic:
RRSP contribution limits Canada current rates

Example output for multiple topics:
RRSP spousal attribution rules Canada
pension income splitting Canada tax benefits
"#,
        client_situation
    )
}

/// Stage 1: web search execution through a search-capable model
pub fn web_search(query: &str) -> String {
    format!(
        r#"Search the web for current information about: {}

Please find and summarize 3-5 relevant search results. For each result, include:
- The key information or finding
- The source website
Focus on Canadian financial regulations, tax rules, and current rates.

Format as:
1. [Key finding from source 1]
2. [Key finding from source 2]
3. [Key finding from source 3]
Sources: [list source URLs or domains, comma separated]"#,
        query
    )
}

/// Stage 2: synthesis into the reference document schema
pub fn reference_synthesis(client_situation: &str, regulatory_results: &str, web_results: &str) -> String {
    format!(
        r#"CLIENT SITUATION:
{}

CRA REGULATORY DOCUMENTS:
{}

CURRENT WEB INFORMATION:
{}

Generate advisor reference material as a single JSON object with exactly this shape:

{{
  "regulatory_overview": [
    {{ "regulation": "rule or limit name", "source": "CRA chapter/section", "details": "what it says" }}
  ],
  "web_findings": [
    {{ "finding": "current figure or change", "source_url": "https://...", "relevance": "why it matters here" }}
  ],
  "final_recommendation": {{
    "answer": "direct answer to the client situation",
    "reasoning": "how the sources support it",
    "next_steps": ["step 1", "step 2"]
  }},
  "current_numbers": {{
    "figure name (e.g. 2025 TFSA annual limit)": "latest limit, rate or deadline from the web information"
  }},
  "source_references": ["CRA chapters and web sources used"],
  "advisor_notes": ["compliance considerations or planning opportunities"]
}}

Only use facts present in the documents above. Leave a list or object empty when nothing applies.
Focus on factual information for advisor reference, not client advice.
Return only the JSON object.
"#,
        client_situation, regulatory_results, web_results
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_embed_inputs() {
        assert!(regulatory_queries("RRSP room").starts_with("Client situation: RRSP room"));
        assert!(web_queries("TFSA").contains("1-2 web search queries"));
        assert!(web_search("FHSA limit").contains("about: FHSA limit"));

        let synthesis = reference_synthesis("sit", "reg", "web");
        assert!(synthesis.contains("CLIENT SITUATION:\nsit"));
        assert!(synthesis.contains("\"regulatory_overview\""));
        assert!(synthesis.contains("\"current_numbers\""));
    }
}
