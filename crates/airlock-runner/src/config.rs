//! Configuration types for the LLM runner.
//!
//! All configuration is loaded from environment variables. The runner needs
//! to know how to reach each backend family (URL and API key) and where to
//! look for prompt template overrides. The backend for an agent is chosen by
//! its model tag: `claude*` models go to the Anthropic Messages API,
//! everything else to an `OpenAI`-compatible chat completions endpoint.

use crate::error::RunnerError;

/// Default `OpenAI`-compatible base URL.
pub const DEFAULT_OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// Default Anthropic base URL.
pub const DEFAULT_ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1";

/// Complete runner configuration loaded from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// `OpenAI`-compatible endpoint.
    pub openai: EndpointConfig,
    /// Anthropic endpoint.
    pub anthropic: EndpointConfig,
    /// Directory with template overrides; built-in templates otherwise.
    pub templates_dir: Option<String>,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
}

/// Where and how to reach one backend family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Base API URL.
    pub api_url: String,
    /// API key; empty for keyless local endpoints.
    pub api_key: String,
}

/// Configuration for one bound backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmBackendConfig {
    /// The backend protocol.
    pub backend_type: BackendType,
    /// Base API URL (e.g. `https://api.openai.com/v1`).
    pub api_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
}

/// Supported LLM backend protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

impl BackendType {
    /// Pick the protocol for `model`.
    pub fn for_model(model: &str) -> Self {
        if model.to_lowercase().starts_with("claude") {
            Self::Anthropic
        } else {
            Self::OpenAi
        }
    }
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional variables:
    /// - `LLM_OPENAI_API_URL` -- `OpenAI`-compatible base URL (default `https://api.openai.com/v1`)
    /// - `LLM_OPENAI_API_KEY` -- `OpenAI`-compatible API key
    /// - `LLM_ANTHROPIC_API_URL` -- Anthropic base URL (default `https://api.anthropic.com/v1`)
    /// - `LLM_ANTHROPIC_API_KEY` -- Anthropic API key
    /// - `LLM_MAX_TOKENS` -- completion budget (default 256)
    /// - `TEMPLATES_DIR` -- prompt template overrides
    pub fn from_env() -> Result<Self, RunnerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RunnerError> {
        let var = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        let max_tokens: u32 = var("LLM_MAX_TOKENS", "256")
            .parse()
            .map_err(|e| RunnerError::Config(format!("invalid LLM_MAX_TOKENS: {e}")))?;
        if max_tokens == 0 {
            return Err(RunnerError::Config("LLM_MAX_TOKENS must be positive".to_owned()));
        }

        Ok(Self {
            openai: EndpointConfig {
                api_url: var("LLM_OPENAI_API_URL", DEFAULT_OPENAI_API_URL),
                api_key: var("LLM_OPENAI_API_KEY", ""),
            },
            anthropic: EndpointConfig {
                api_url: var("LLM_ANTHROPIC_API_URL", DEFAULT_ANTHROPIC_API_URL),
                api_key: var("LLM_ANTHROPIC_API_KEY", ""),
            },
            templates_dir: lookup("TEMPLATES_DIR").filter(|v| !v.trim().is_empty()),
            max_tokens,
        })
    }

    /// Backend configuration for `model`.
    pub fn backend_for(&self, model: &str) -> LlmBackendConfig {
        let backend_type = BackendType::for_model(model);
        let endpoint = match backend_type {
            BackendType::OpenAi => &self.openai,
            BackendType::Anthropic => &self.anthropic,
        };
        LlmBackendConfig {
            backend_type,
            api_url: endpoint.api_url.trim_end_matches('/').to_owned(),
            api_key: endpoint.api_key.clone(),
            model: model.to_owned(),
            max_tokens: self.max_tokens,
        }
    }
}
