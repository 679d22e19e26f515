//! Parallel research
//!
//! Every planned query, regulatory and web alike, runs as its own future and
//! all of them are awaited together. A failing or timed-out query becomes a
//! placeholder entry bound to that query; it never aborts its siblings.

use crate::config::ResearchLimits;
use crate::error::OrchestrationError;
use crate::models::{
    Passage, RegulatorySearchResult, ResearchBundle, ResearchEntry, SearchQuery, SearchResult,
};
use crate::search::{SearchProvider, WebSearchProvider};
use crate::Result;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct ResearchCoordinator {
    search: Arc<dyn SearchProvider>,
    web: Arc<dyn WebSearchProvider>,
    limits: ResearchLimits,
}

impl ResearchCoordinator {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        web: Arc<dyn WebSearchProvider>,
        limits: ResearchLimits,
    ) -> Self {
        Self { search, web, limits }
    }

    pub fn limits(&self) -> &ResearchLimits {
        &self.limits
    }

    /// Run all queries concurrently. Entries come back in planned order.
    pub async fn research(&self, regulatory: &[SearchQuery], web: &[SearchQuery]) -> ResearchBundle {
        let started = Instant::now();

        let regulatory_tasks = regulatory.iter().map(|q| self.run_regulatory(q.clone()));
        let web_tasks = web.iter().map(|q| self.run_web(q.clone()));

        let (regulatory, web) = futures::join!(join_all(regulatory_tasks), join_all(web_tasks));
        let bundle = ResearchBundle { regulatory, web };

        info!(
            queries = bundle.len(),
            failures = bundle.failure_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Research complete"
        );

        bundle
    }

    async fn run_regulatory(&self, query: SearchQuery) -> ResearchEntry {
        let outcome = self.bounded(self.search.search(&query.text)).await;

        match outcome {
            Ok(passages) => {
                let passages = self.trim_passages(passages);
                debug!(query = %query, passages = passages.len(), "Regulatory search done");
                let result = SearchResult::Regulatory(RegulatorySearchResult {
                    query: query.text.clone(),
                    passages,
                });
                ResearchEntry::found(query, result)
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Regulatory search failed");
                ResearchEntry::failed(query)
            }
        }
    }

    async fn run_web(&self, query: SearchQuery) -> ResearchEntry {
        match self.bounded(self.web.search(&query.text)).await {
            Ok(result) => {
                debug!(query = %query, sources = result.source_urls.len(), "Web search done");
                ResearchEntry::found(query, SearchResult::Web(result))
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Web search failed");
                ResearchEntry::failed(query)
            }
        }
    }

    /// Applies the per-query deadline, if any
    async fn bounded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.limits.query_timeout {
            Some(deadline) => tokio::time::timeout(deadline, call).await.map_err(|_| {
                OrchestrationError::SearchError(format!(
                    "query timed out after {}s",
                    deadline.as_secs_f32()
                ))
            })?,
            None => call.await,
        }
    }

    fn trim_passages(&self, mut passages: Vec<Passage>) -> Vec<Passage> {
        passages.truncate(self.limits.max_passages_per_query);
        for passage in &mut passages {
            truncate_chars(&mut passage.text, self.limits.max_passage_chars);
        }
        passages
    }
}

/// Truncate to at most `max` characters without splitting a code point
pub fn truncate_chars(text: &mut String, max: usize) {
    if let Some((cut, _)) = text.char_indices().nth(max) {
        text.truncate(cut);
    }
}
