//! Model-backed oracles for the leave workflow.
//!
//! The model only answers the two questions the workflow asks (is this request eligible, may
//! this approver act). It never mutates a request: the core engine folds each verdict into
//! state and remains the authority on which approvers are still outstanding.
//!
//! - `llm`: the `LlmClient` seam, retries, and client construction from config
//! - `openai` / `ollama`: HTTP clients for the two supported providers
//! - `prompts`: query-to-prompt rendering
//! - `extract`: lenient JSON recovery from model output
//! - `oracle`: `LlmOracle`, implementing both oracle traits

pub mod extract;
pub mod llm;
pub mod ollama;
pub mod openai;
pub mod oracle;
pub mod prompts;

pub use llm::{client_from_config, CompletionRequest, LlmClient, LlmError, RetryPolicy};
pub use ollama::{OllamaClient, OllamaStatus};
pub use openai::OpenAiClient;
pub use oracle::LlmOracle;
