//! Error types for the LLM decision runner.
//!
//! Uses `thiserror` for typed errors that surface through the runner
//! pipeline: configuration, LLM calls, prompt rendering, response parsing.

use airlock_core::decision::DecisionError;

/// Errors that can occur while producing an LLM decision.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Failed to load or render a prompt template.
    #[error("template error: {0}")]
    Template(String),

    /// An LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// The LLM response could not be mapped to a legal decision.
    #[error("response parse error: {0}")]
    Parse(String),

    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The oracle was asked to decide for an agent it has no seat for.
    #[error("no seat for agent {0}")]
    UnknownAgent(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<RunnerError> for DecisionError {
    fn from(error: RunnerError) -> Self {
        match error {
            RunnerError::Parse(raw) => Self::Unparseable { raw },
            other => Self::Failed {
                message: other.to_string(),
            },
        }
    }
}
