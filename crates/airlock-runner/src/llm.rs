//! LLM backend abstraction and implementations.
//!
//! Enum dispatch over the two wire protocols the runner speaks: the
//! `OpenAI`-compatible chat completions API and the Anthropic Messages API.
//! Both protocols share one send path; they differ only in endpoint,
//! headers, request body and where the text sits in the response.

use serde_json::Value;

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::RunnerError;
use crate::prompt::RenderedPrompt;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// An LLM backend that can complete a prompt.
#[derive(Debug, Clone)]
pub enum LlmBackend {
    /// `OpenAI`-compatible chat completions API.
    OpenAi(HttpBackend),
    /// Anthropic Messages API.
    Anthropic(HttpBackend),
}

/// Connection details shared by both protocols.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl LlmBackend {
    /// Send `prompt` and return the response text.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::LlmBackend`] if the HTTP call fails, the
    /// status is not a success, or the response has no text.
    pub async fn complete(
        &self,
        prompt: &RenderedPrompt,
        temperature: f32,
    ) -> Result<String, RunnerError> {
        let (backend, request) = match self {
            Self::OpenAi(backend) => {
                let mut request = backend
                    .client
                    .post(format!("{}/chat/completions", backend.api_url))
                    .json(&openai_body(backend, prompt, temperature));
                if !backend.api_key.is_empty() {
                    request = request.bearer_auth(&backend.api_key);
                }
                (backend, request)
            }
            Self::Anthropic(backend) => {
                let request = backend
                    .client
                    .post(format!("{}/messages", backend.api_url))
                    .header("x-api-key", &backend.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&anthropic_body(backend, prompt, temperature));
                (backend, request)
            }
        };
        let json = send(request, self.name(), &backend.model).await?;
        self.extract(&json)
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => "openai-compatible",
            Self::Anthropic(_) => "anthropic",
        }
    }

    /// The bound model.
    pub fn model(&self) -> &str {
        match self {
            Self::OpenAi(backend) | Self::Anthropic(backend) => &backend.model,
        }
    }

    fn extract(&self, json: &Value) -> Result<String, RunnerError> {
        let text = match self {
            Self::OpenAi(_) => json
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str),
            Self::Anthropic(_) => json.pointer("/content/0/text").and_then(Value::as_str),
        };
        text.map(ToOwned::to_owned).ok_or_else(|| {
            RunnerError::LlmBackend(format!("{} response carries no text", self.name()))
        })
    }
}

fn openai_body(backend: &HttpBackend, prompt: &RenderedPrompt, temperature: f32) -> Value {
    serde_json::json!({
        "model": backend.model,
        "messages": [
            {"role": "system", "content": prompt.system},
            {"role": "user", "content": prompt.user},
        ],
        "temperature": temperature,
        "max_tokens": backend.max_tokens,
    })
}

fn anthropic_body(backend: &HttpBackend, prompt: &RenderedPrompt, temperature: f32) -> Value {
    serde_json::json!({
        "model": backend.model,
        "system": prompt.system,
        "messages": [{"role": "user", "content": prompt.user}],
        "temperature": temperature,
        "max_tokens": backend.max_tokens,
    })
}

async fn send(
    request: reqwest::RequestBuilder,
    provider: &str,
    model: &str,
) -> Result<Value, RunnerError> {
    let response = request.send().await.map_err(|e| {
        RunnerError::LlmBackend(format!("{provider} request for {model} failed: {e}"))
    })?;

    let status = response.status();
    if !status.is_success() {
        let detail = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
        return Err(RunnerError::LlmBackend(format!(
            "{provider} returned {status} for {model}: {detail}"
        )));
    }

    response
        .json()
        .await
        .map_err(|e| RunnerError::LlmBackend(format!("{provider} response is not JSON: {e}")))
}

/// Create a backend from configuration, sharing `client`'s connection pool.
pub fn create_backend(client: reqwest::Client, config: &LlmBackendConfig) -> LlmBackend {
    let backend = HttpBackend {
        client,
        api_url: config.api_url.trim_end_matches('/').to_owned(),
        api_key: config.api_key.clone(),
        model: config.model.clone(),
        max_tokens: config.max_tokens,
    };
    match config.backend_type {
        BackendType::OpenAi => LlmBackend::OpenAi(backend),
        BackendType::Anthropic => LlmBackend::Anthropic(backend),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::unreachable, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn backend(backend_type: BackendType, model: &str) -> LlmBackend {
        create_backend(
            reqwest::Client::new(),
            &LlmBackendConfig {
                backend_type,
                api_url: "http://127.0.0.1:9/v1/".to_owned(),
                api_key: String::new(),
                model: model.to_owned(),
                max_tokens: 64,
            },
        )
    }

    fn prompt() -> RenderedPrompt {
        RenderedPrompt {
            system: "You are Agent_2.".to_owned(),
            user: "Where do you go?".to_owned(),
        }
    }

    #[test]
    fn openai_text_sits_in_the_first_choice() {
        let llm = backend(BackendType::OpenAi, "gpt-4o");
        let json = serde_json::json!({"choices": [{"message": {"content": "Electrical"}}]});
        assert_eq!(llm.extract(&json).ok().as_deref(), Some("Electrical"));
        assert!(llm.extract(&serde_json::json!({"error": "rate_limit"})).is_err());
    }

    #[test]
    fn anthropic_text_sits_in_the_first_block() {
        let llm = backend(BackendType::Anthropic, "claude-3-haiku-20240307");
        let json = serde_json::json!({"content": [{"type": "text", "text": "SKIP"}]});
        assert_eq!(llm.extract(&json).ok().as_deref(), Some("SKIP"));
        assert!(llm.extract(&serde_json::json!({"content": []})).is_err());
    }

    #[test]
    fn bodies_place_the_system_prompt_per_protocol() {
        let LlmBackend::OpenAi(openai) = backend(BackendType::OpenAi, "gpt-4o") else {
            unreachable!("built as openai");
        };
        let body = openai_body(&openai, &prompt(), 0.1);
        assert_eq!(body.pointer("/messages/0/role"), Some(&serde_json::json!("system")));
        assert_eq!(body["max_tokens"], 64);

        let LlmBackend::Anthropic(anthropic) =
            backend(BackendType::Anthropic, "claude-3-opus-20240229")
        else {

            unreachable!("built as anthropic");
        };
        let body = anthropic_body(&anthropic, &prompt(), 1.0);
        assert_eq!(body["system"], "You are Agent_2.");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn trailing_slash_is_trimmed_from_the_url() {
        let LlmBackend::OpenAi(openai) = backend(BackendType::OpenAi, "gpt-4") else {
            unreachable!("built as openai");
        };
        assert_eq!(openai.api_url, "http://127.0.0.1:9/v1");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_backend_error() {
        let llm = backend(BackendType::OpenAi, "gpt-4o");
        let err = llm.complete(&prompt(), 0.1).await.unwrap_err();
        assert!(matches!(err, RunnerError::LlmBackend(msg) if msg.contains("gpt-4o")));
    }
}
