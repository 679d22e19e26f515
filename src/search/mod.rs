//! Search capabilities consumed by the research stage
//!
//! Regulatory search goes to a vector knowledge base; web search goes to a
//! provider that can reach current information. Both are traits so the
//! pipeline can run against stubs.

use crate::models::{Passage, WebSearchResult};
use crate::Result;
use async_trait::async_trait;

pub mod knowledge_base;
pub mod web;

pub use knowledge_base::KnowledgeBaseClient;
pub use web::LlmWebSearch;

/// Ranked passage retrieval over the regulatory knowledge base
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Passage>>;
}

/// Natural-language summary of current web information, with sources
#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<WebSearchResult>;
}
