//! Advisor Reference Orchestrator
//!
//! Turns a free-text client situation into structured reference material
//! for a financial advisor:
//! - Plans regulatory and web search queries with an LLM (keyword fallback)
//! - Runs every query concurrently; one failing query never sinks the rest
//! - Synthesises the findings into a typed `ReferenceDocument`
//!
//! PIPELINE:
//! INPUT → VALIDATE → PLAN → RESEARCH → SYNTHESIZE → DOCUMENT

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod planner;
pub mod prompts;
pub mod research;
pub mod search;
pub mod synthesis;

#[cfg(test)]
mod testing;

pub use error::{OrchestrationError, Result};

// Re-export common types
pub use agent::{ReferenceAgent, ReferenceReport};
pub use models::*;
