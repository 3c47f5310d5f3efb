use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::llm::{trim_base_url, CompletionRequest, LlmClient, LlmError};

const STATUS_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a local Ollama server's `/api/generate`.
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Result of probing `/api/tags`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OllamaStatus {
    pub running: bool,
    pub target_model: String,
    pub model_available: bool,
    pub available_models: Vec<String>,
    pub error: Option<String>,
}

impl OllamaClient {
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .build()
            .map_err(|error| LlmError::Client(error.to_string()))?;

        Ok(Self { http, base_url: trim_base_url(base_url), model: model.into() })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    /// Folds system and user text into one prompt; `/api/generate` has no message roles.
    pub fn prompt(request: &CompletionRequest) -> String {
        format!(
            "You are a helpful AI assistant specialized in HR policy analysis.\n\n\
             SYSTEM INSTRUCTIONS:\n{}\n\n\
             USER REQUEST:\n{}\n\n\
             IMPORTANT:\n\
             - Respond ONLY with valid JSON\n\
             - Do not include any explanatory text before or after the JSON\n\
             - Ensure all keys are present in the response\n\
             - Be precise and factual based only on the provided information\n\n\
             Your JSON response:",
            request.system, request.user
        )
    }

    pub fn payload(&self, request: &CompletionRequest) -> Value {
        json!({
            "model": self.model,
            "prompt": Self::prompt(request),
            "stream": false,
            "format": "json",
            "options": {
                "temperature": 0.0,
                "top_p": 0.95,
                "top_k": 40,
                "num_predict": 800,
                "repeat_penalty": 1.1,
            },
        })
    }

    /// Reports whether the server answers and whether the configured model is pulled.
    pub async fn status(&self) -> OllamaStatus {
        let endpoint = format!("{}/api/tags", self.base_url);
        let offline = |error: String| OllamaStatus {
            running: false,
            target_model: self.model.clone(),
            model_available: false,
            available_models: Vec::new(),
            error: Some(error),
        };

        let response =
            match self.http.get(&endpoint).timeout(STATUS_PROBE_TIMEOUT).send().await {
                Ok(response) => response,
                Err(error) => {
                    return offline(format!("cannot connect to ollama at {endpoint}: {error}"))
                }
            };
        if !response.status().is_success() {
            return offline(format!("{endpoint} returned status {}", response.status()));
        }

        match response.json::<TagsResponse>().await {
            Ok(tags) => {
                let available_models: Vec<String> =
                    tags.models.into_iter().map(|entry| entry.name).collect();
                OllamaStatus {
                    running: true,
                    target_model: self.model.clone(),
                    model_available: available_models.contains(&self.model),
                    available_models,
                    error: None,
                }
            }
            Err(error) => OllamaStatus {
                running: true,
                target_model: self.model.clone(),
                model_available: false,
                available_models: Vec::new(),
                error: Some(format!("could not decode model list: {error}")),
            },
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn provider(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let endpoint = self.endpoint();
        let response = self
            .http
            .post(&endpoint)
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

        let decoded: GenerateResponse = response
            .json()
            .await
            .map_err(|error| LlmError::Decode { endpoint, message: error.to_string() })?;

        if decoded.response.trim().is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        Ok(decoded.response)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{OllamaClient, TagsResponse};
    use crate::llm::CompletionRequest;

    fn request() -> CompletionRequest {
        CompletionRequest {
            system: "You are an HR authorization validator.".to_string(),
            user: "Validate approver authority".to_string(),
        }
    }

    #[test]
    fn payload_disables_streaming_and_forces_json() {
        let client =
            OllamaClient::new("http://localhost:11434/", "llama3.2:latest", Duration::from_secs(5))
                .expect("client");
        let payload = client.payload(&request());

        assert_eq!(client.endpoint(), "http://localhost:11434/api/generate");
        assert_eq!(payload["model"], "llama3.2:latest");
        assert_eq!(payload["stream"], false);
        assert_eq!(payload["format"], "json");
        assert_eq!(payload["options"]["temperature"], 0.0);
        assert_eq!(payload["options"]["num_predict"], 800);
    }

    #[test]
    fn prompt_carries_both_sections() {
        let prompt = OllamaClient::prompt(&request());
        assert!(prompt.contains("SYSTEM INSTRUCTIONS:\nYou are an HR authorization validator."));
        assert!(prompt.contains("USER REQUEST:\nValidate approver authority"));
        assert!(prompt.ends_with("Your JSON response:"));
    }

    #[test]
    fn tags_response_lists_model_names() {
        let tags: TagsResponse = serde_json::from_str(
            r#"{"models": [{"name": "llama3.2:latest", "size": 2019393189}, {"name": "mistral:7b"}]}"#,
        )
        .expect("decode");
        let names: Vec<String> = tags.models.into_iter().map(|entry| entry.name).collect();
        assert_eq!(names, vec!["llama3.2:latest", "mistral:7b"]);
    }

    #[tokio::test]
    async fn status_reports_unreachable_server() {
        // Port 9 (discard) is never an Ollama server.
        let client =
            OllamaClient::new("http://127.0.0.1:9", "llama3.2:latest", Duration::from_secs(1))
                .expect("client");
        let status = client.status().await;

        assert!(!status.running);
        assert!(!status.model_available);
        assert!(status.error.is_some());
    }
}
