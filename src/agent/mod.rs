//! Reference agent - the pipeline entry point
//!
//! INPUT → VALIDATE → PLAN → RESEARCH → SYNTHESIZE → DOCUMENT

use crate::config::Settings;
use crate::llm::{build_generator, build_web_generator, TextGenerator};
use crate::models::{ClientSituation, ReferenceDocument, ResearchBundle};
use crate::planner::{QueryPlan, QueryPlanner};
use crate::research::ResearchCoordinator;
use crate::search::{KnowledgeBaseClient, LlmWebSearch, SearchProvider, WebSearchProvider};
use crate::synthesis::SynthesisEngine;
use crate::Result;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

pub const INTERNAL_ERROR: &str = "internal error while generating reference";

/// Everything one pipeline run produced
#[derive(Debug, Clone, Serialize)]
pub struct ReferenceReport {
    pub request_id: Uuid,
    pub document: ReferenceDocument,
    pub queries: QueryPlan,
    pub bundle: ResearchBundle,
    pub elapsed_ms: u64,
    pub generated_at: DateTime<Utc>,
}

pub struct ReferenceAgent {
    planner: QueryPlanner,
    coordinator: ResearchCoordinator,
    synthesis: SynthesisEngine,
    max_situation_chars: usize,
}

impl ReferenceAgent {
    pub fn new(
        planner: QueryPlanner,
        coordinator: ResearchCoordinator,
        synthesis: SynthesisEngine,
        max_situation_chars: usize,
    ) -> Self {
        Self {
            planner,
            coordinator,
            synthesis,
            max_situation_chars,
        }
    }

    /// Wire the pipeline from explicit providers. The same generator plans and
    /// synthesises.
    pub fn with_providers(
        generator: Arc<dyn TextGenerator>,
        search: Arc<dyn SearchProvider>,
        web: Arc<dyn WebSearchProvider>,
        settings: &Settings,
    ) -> Self {
        Self::new(
            QueryPlanner::new(generator.clone()),
            ResearchCoordinator::new(search, web, settings.limits),
            SynthesisEngine::new(generator),
            settings.max_situation_chars,
        )
    }

    /// Build the configured providers: LLM fallback chain, Weaviate knowledge
    /// base and search-grounded web search
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let generator: Arc<dyn TextGenerator> = Arc::new(build_generator(settings)?);
        let web_generator: Arc<dyn TextGenerator> = Arc::new(build_web_generator(settings)?);
        let search: Arc<dyn SearchProvider> = Arc::new(
            KnowledgeBaseClient::new(&settings.knowledge_base)?
                .with_limit(settings.limits.max_passages_per_query),
        );
        let web: Arc<dyn WebSearchProvider> = Arc::new(LlmWebSearch::new(web_generator));

        info!(
            generator = generator.name(),
            knowledge_base = %settings.knowledge_base.url,
            "Reference agent initialized"
        );

        Ok(Self::with_providers(generator, search, web, settings))
    }

    /// Only the document
    pub async fn generate_reference(&self, client_situation: &str) -> Result<ReferenceDocument> {
        Ok(self.generate_report(client_situation).await?.document)
    }

    /// Validate, then run the pipeline. Only validation errors are returned;
    /// every other failure is reported inside the document.
    pub async fn generate_report(&self, client_situation: &str) -> Result<ReferenceReport> {
        let situation = ClientSituation::parse_with_limit(client_situation, self.max_situation_chars)?;

        let request_id = Uuid::new_v4();
        let fingerprint = situation.fingerprint();
        let start_time = Instant::now();

        info!(
            %request_id,
            situation = %fingerprint,
            chars = situation.as_str().chars().count(),
            "Generating reference"
        );

        let run = AssertUnwindSafe(self.run_pipeline(&situation)).catch_unwind().await;

        let (document, queries, bundle) = match run {
            Ok(output) => output,
            Err(_) => {
                error!(%request_id, situation = %fingerprint, "Reference pipeline panicked");
                (
                    ReferenceDocument::failed(INTERNAL_ERROR, None),
                    QueryPlan {
                        regulatory: Vec::new(),
                        web: Vec::new(),
                    },
                    ResearchBundle::default(),
                )
            }
        };

        let elapsed_ms = start_time.elapsed().as_millis() as u64;

        info!(
            %request_id,
            situation = %fingerprint,
            elapsed_ms,
            failed = document.is_failed(),
            "Reference generated"
        );

        Ok(ReferenceReport {
            request_id,
            document,
            queries,
            bundle,
            elapsed_ms,
            generated_at: Utc::now(),
        })
    }

    async fn run_pipeline(
        &self,
        situation: &ClientSituation,
    ) -> (ReferenceDocument, QueryPlan, ResearchBundle) {
        // === PLAN ===
        let queries = self.planner.plan(situation).await;
        debug!(
            regulatory = queries.regulatory.len(),
            web = queries.web.len(),
            "Queries planned"
        );

        // === RESEARCH ===
        let bundle = self
            .coordinator
            .research(&queries.regulatory, &queries.web)
            .await;

        // === SYNTHESIZE ===
        let document = self.synthesis.synthesize(situation, &bundle).await;

        (document, queries, bundle)
    }
}
