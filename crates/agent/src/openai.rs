use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::llm::{trim_base_url, CompletionRequest, LlmClient, LlmError};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat completions client, pinned to JSON-object output.
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        api_key: SecretString,
        base_url: Option<&str>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .map_err(|error| LlmError::Client(error.to_string()))?;

        Ok(Self {
            http,
            base_url: trim_base_url(base_url.unwrap_or(DEFAULT_OPENAI_BASE_URL)),
            api_key,
            model: model.into(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    pub fn payload(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "temperature": 0,
            "response_format": { "type": "json_object" },
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn provider(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.payload(request))
            .send()
            .await
            .map_err(|error| LlmError::Transport {
                endpoint: endpoint.clone(),
                message: error.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status { endpoint, status: status.as_u16(), body });
        }

        let decoded: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|error| LlmError::Decode { endpoint, message: error.to_string() })?;

        decoded
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{ChatCompletionResponse, OpenAiClient};
    use crate::llm::CompletionRequest;

    fn client(base_url: Option<&str>) -> OpenAiClient {
        let api_key = "sk-test".to_string().into();
        OpenAiClient::new(api_key, base_url, "gpt-4o-mini", Duration::from_secs(5)).expect("client")
    }

    #[test]
    fn payload_requests_deterministic_json_output() {
        let payload = client(None).payload(&CompletionRequest {
            system: "You are an HR policy analyst.".to_string(),
            user: "Analyze this leave request".to_string(),
        });

        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["temperature"], 0);
        assert_eq!(payload["response_format"]["type"], "json_object");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "Analyze this leave request");
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        assert_eq!(client(None).endpoint(), "https://api.openai.com/v1/chat/completions");
        assert_eq!(
            client(Some("http://localhost:8000/v1/")).endpoint(),
            "http://localhost:8000/v1/chat/completions"
        );
    }

    #[test]
    fn response_without_choices_decodes_empty() {
        let decoded: ChatCompletionResponse =
            serde_json::from_str(r#"{"id": "chatcmpl-1"}"#).expect("decode");
        assert!(decoded.choices.is_empty());
    }
}
