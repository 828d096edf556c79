//! Client for the external text-completion service (Ollama HTTP API).
//!
//! [`CompletionService`] is the seam the chat endpoint depends on;
//! [`OllamaClient`] is the production implementation. Failures are typed
//! as [`CompletionError`], whose `Display` output is the user-facing text
//! returned in place of a model answer.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::OllamaConfig;

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Error: Cannot connect to Ollama. Make sure Ollama is running.")]
    Unreachable,
    #[error("Error: Request timed out. The model may be loading, please try again.")]
    Timeout,
    #[error("Error: Unexpected response format from Ollama")]
    MalformedResponse,
    #[error("Error: {status} - {body}")]
    Status { status: u16, body: String },
    #[error("Error communicating with Ollama: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout
        } else if e.is_connect() {
            CompletionError::Unreachable
        } else if e.is_decode() {
            CompletionError::MalformedResponse
        } else {
            CompletionError::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generate a completion for `prompt` with `model`.
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, CompletionError>;

    /// Names of the models the service can run.
    async fn list_models(&self) -> Result<Vec<String>, CompletionError>;
}

pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            client,
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl CompletionService for OllamaClient {
    async fn generate(&self, prompt: &str, model: &str) -> Result<String, CompletionError> {
        tracing::info!(model, prompt_chars = prompt.chars().count(), "querying completion service");

        let body = serde_json::json!({
            "model": model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), body = %text, "completion service returned an error");
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_generate_response(&text)
    }

    async fn list_models(&self) -> Result<Vec<String>, CompletionError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.probe_timeout)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_tags_response(&text)
    }
}

/// Extracts the `response` string of a non-streaming `/api/generate` reply.
pub fn parse_generate_response(body: &str) -> Result<String, CompletionError> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|_| CompletionError::MalformedResponse)?;
    match json.get("response").and_then(|r| r.as_str()) {
        Some(text) => Ok(text.to_string()),
        None => {
            tracing::warn!(body, "unexpected completion response shape");
            Err(CompletionError::MalformedResponse)
        }
    }
}

/// Extracts model names from an `/api/tags` reply.
pub fn parse_tags_response(body: &str) -> Result<Vec<String>, CompletionError> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|_| CompletionError::MalformedResponse)?;
    let models = match json.get("models") {
        Some(serde_json::Value::Array(models)) => models,
        None | Some(serde_json::Value::Null) => return Ok(Vec::new()),
        Some(_) => return Err(CompletionError::MalformedResponse),
    };
    Ok(models
        .iter()
        .filter_map(|m| m.get("name").and_then(|n| n.as_str()))
        .map(str::to_string)
        .collect())
}
