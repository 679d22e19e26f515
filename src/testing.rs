//! Stub providers shared by the unit tests.
//! Only compiled for tests.

use crate::error::OrchestrationError;
use crate::llm::TextGenerator;
use crate::models::{Passage, WebSearchResult};
use crate::search::{SearchProvider, WebSearchProvider};
use crate::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

type Script = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Text generator whose reply is computed from the prompt
pub struct ScriptedGenerator {
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn constant(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::new(move |_| Ok(reply.clone()))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.script)(prompt)
    }
}

/// Text generator that always fails
pub struct FailingGenerator {
    name: String,
}

impl FailingGenerator {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(OrchestrationError::GenerationError(format!("{} unavailable", self.name)))
    }
}

pub fn passage(title: &str, text: &str, score: f32) -> Passage {
    Passage {
        title: title.to_string(),
        text: text.to_string(),
        score,
    }
}

/// Per-query behaviour shared by the search stubs
#[derive(Default)]
struct Behaviour {
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    barrier: Option<Arc<Barrier>>,
    calls: Mutex<Vec<String>>,
}

impl Behaviour {
    async fn run(&self, query: &str) -> Result<()> {
        self.calls.lock().unwrap().push(query.to_string());

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing.contains(query) || self.failing.contains("*") {
            return Err(OrchestrationError::SearchError(format!("stub failure for {}", query)));
        }
        Ok(())
    }
}

/// Knowledge-base stub: fixed passages per query, optional failures/delays
#[derive(Default)]
pub struct StubSearch {
    passages: HashMap<String, Vec<Passage>>,
    default_passages: Vec<Passage>,
    behaviour: Behaviour,
}

impl StubSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default(mut self, passages: Vec<Passage>) -> Self {
        self.default_passages = passages;
        self
    }

    pub fn with_passages(mut self, query: &str, passages: Vec<Passage>) -> Self {
        self.passages.insert(query.to_string(), passages);
        self
    }

    /// `"*"` fails every query
    pub fn failing_on(mut self, query: &str) -> Self {
        self.behaviour.failing.insert(query.to_string());
        self
    }

    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.behaviour.delays.insert(query.to_string(), delay);
        self
    }

    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.behaviour.barrier = Some(barrier);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.behaviour.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchProvider for StubSearch {
    async fn search(&self, query: &str) -> Result<Vec<Passage>> {
        self.behaviour.run(query).await?;
        Ok(self
            .passages
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.default_passages.clone()))
    }
}

/// Web-search stub: summary derived from the query
#[derive(Default)]
pub struct StubWebSearch {
    behaviour: Behaviour,
}

impl StubWebSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.behaviour.failing.insert(query.to_string());
        self
    }

    pub fn with_delay(mut self, query: &str, delay: Duration) -> Self {
        self.behaviour.delays.insert(query.to_string(), delay);
        self
    }

    pub fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.behaviour.barrier = Some(barrier);
        self
    }
}

#[async_trait]
impl WebSearchProvider for StubWebSearch {
    async fn search(&self, query: &str) -> Result<WebSearchResult> {
        self.behaviour.run(query).await?;
        Ok(WebSearchResult {
            query: query.to_string(),
            summary_text: format!("Current information about {}", query),
            source_urls: vec!["https://www.canada.ca".to_string()],
        })
    }
}
