//! Error types for the advisor reference orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Caller-visible
    // =============================

    #[error("Validation error: {0}")]
    ValidationError(String),

    // =============================
    // Provider failures (recovered locally)
    // =============================

    #[error("Search error: {0}")]
    SearchError(String),

    #[error("Generation error: {0}")]
    GenerationError(String),

    #[error("Synthesis parse error: could not extract valid JSON from response: {preview}")]
    SynthesisParseError { preview: String },

    // =============================
    // Startup
    // =============================

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OrchestrationError {
    /// Errors the caller caused and can fix by changing the input
    pub fn is_validation(&self) -> bool {
        matches!(self, OrchestrationError::ValidationError(_))
    }
}
