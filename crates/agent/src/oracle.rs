use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use leaveflow_core::oracle::{
    AuthorityOracle, AuthorityQuery, AuthorityVerdict, EligibilityOracle, EligibilityQuery,
    EligibilityVerdict, OracleError,
};
use serde::de::DeserializeOwned;

use crate::extract::decode_verdict;
use crate::llm::{complete_with_retry, CompletionRequest, LlmClient, LlmError, RetryPolicy};
use crate::prompts::{authority_prompt, eligibility_prompt};

/// Answers both oracle questions by prompting a model and decoding its JSON reply.
pub struct LlmOracle {
    client: Arc<dyn LlmClient>,
    retry: RetryPolicy,
}

impl LlmOracle {
    pub fn new(client: Arc<dyn LlmClient>, retry: RetryPolicy) -> Self {
        Self { client, retry }
    }

    async fn ask<T: DeserializeOwned>(
        &self,
        question: &'static str,
        request: CompletionRequest,
    ) -> Result<T, OracleError> {
        let started = Instant::now();
        let text = complete_with_retry(self.client.as_ref(), &request, self.retry)
            .await
            .map_err(oracle_error)?;

        tracing::debug!(
            event_name = "oracle.llm.completed",
            question,
            provider = self.client.provider(),
            model = self.client.model(),
            latency_ms = started.elapsed().as_millis() as u64,
            "model answered"
        );

        decode_verdict(&text).map_err(|message| {
            tracing::warn!(
                event_name = "oracle.llm.malformed",
                question,
                provider = self.client.provider(),
                error = %message,
                "model reply could not be decoded"
            );
            OracleError::Malformed(message)
        })
    }
}

fn oracle_error(error: LlmError) -> OracleError {
    match error {
        LlmError::Decode { .. } | LlmError::EmptyCompletion => {
            OracleError::Malformed(error.to_string())
        }
        other => OracleError::Transport(other.to_string()),
    }
}

#[async_trait]
impl EligibilityOracle for LlmOracle {
    async fn evaluate(&self, query: &EligibilityQuery) -> Result<EligibilityVerdict, OracleError> {
        self.ask("eligibility", eligibility_prompt(query)).await
    }
}

#[async_trait]
impl AuthorityOracle for LlmOracle {
    async fn authorize(&self, query: &AuthorityQuery) -> Result<AuthorityVerdict, OracleError> {
        self.ask("authority", authority_prompt(query)).await
    }
}
