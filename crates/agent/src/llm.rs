use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use leaveflow_core::config::{LlmConfig, LlmProvider};
use thiserror::Error;

use crate::ollama::OllamaClient;
use crate::openai::OpenAiClient;

/// A system instruction plus the rendered user task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("could not build http client: {0}")]
    Client(String),
    #[error("request to `{endpoint}` failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("`{endpoint}` returned status {status}: {body}")]
    Status { endpoint: String, status: u16, body: String },
    #[error("could not decode response from `{endpoint}`: {message}")]
    Decode { endpoint: String, message: String },
    #[error("model returned an empty completion")]
    EmptyCompletion,
    #[error("llm configuration is incomplete: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Connection failures, throttling and server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> &'static str;
    fn model(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, backoff: Duration::from_millis(250) }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &LlmConfig) -> Self {
        Self { max_retries: config.max_retries, ..Self::default() }
    }
}

/// Runs `request`, retrying retryable failures with linear backoff.
pub async fn complete_with_retry(
    client: &dyn LlmClient,
    request: &CompletionRequest,
    policy: RetryPolicy,
) -> Result<String, LlmError> {
    let mut attempt = 0;
    loop {
        match client.complete(request).await {
            Ok(text) => return Ok(text),
            Err(error) if error.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                tracing::warn!(
                    event_name = "oracle.llm.retry",
                    provider = client.provider(),
                    attempt,
                    max_retries = policy.max_retries,
                    error = %error,
                    "retrying model completion"
                );
                tokio::time::sleep(policy.backoff * attempt).await;
            }
            Err(error) => return Err(error),
        }
    }
}

pub fn client_from_config(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let timeout = Duration::from_secs(config.timeout_secs);
    match config.provider {
        LlmProvider::OpenAi => {
            let api_key = config.api_key.clone().ok_or_else(|| {
                LlmError::Configuration("llm.api_key is required for openai".to_string())
            })?;
            let client = OpenAiClient::new(
                api_key,
                config.base_url.as_deref(),
                config.model.clone(),
                timeout,
            )?;
            Ok(Arc::new(client))
        }
        LlmProvider::Ollama => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                LlmError::Configuration("llm.base_url is required for ollama".to_string())
            })?;
            Ok(Arc::new(OllamaClient::new(base_url, config.model.clone(), timeout)?))
        }
    }
}

pub(crate) fn trim_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
