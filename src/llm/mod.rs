//! LLM-backed query generation and self-check.
//!
//! Both stages go through [`TextCompletionService`], a one-method capability
//! (`system` + `user` prompt in, text out). [`LlmClient`] speaks to real
//! providers over HTTP.

pub mod client;
pub mod generator;
pub mod retry;
#[cfg(test)]
pub(crate) mod scripted;
pub mod validator;

pub use client::{LlmClient, LlmProvider};
pub use generator::QueryGenerator;
pub use retry::RetryPolicy;
#[cfg(test)]
pub(crate) use scripted::ScriptedCompletion;
pub use validator::QueryValidator;

use crate::otel::{llm_span, record_llm_attempts, PipelineStage};
use crate::types::{PipelineError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::Instrument;

/// Text completion capability.
#[async_trait]
pub trait TextCompletionService: Send + Sync {
    /// Complete `user` under the `system` instruction.
    ///
    /// # Errors
    ///
    /// `PipelineError::ServiceUnavailable` for transient failures,
    /// `PipelineError::GenerationError` for everything else
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Provider name, for tracing.
    fn provider(&self) -> &str {
        "custom"
    }

    /// Model name, for tracing.
    fn model(&self) -> &str {
        "unknown"
    }
}

/// Timeout and retry settings shared by generator and validator.
#[derive(Debug, Clone, PartialEq)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Issue one completion call bounded by `policy.timeout`, retried per `policy.retry`.
pub(crate) async fn complete_with_policy(
    service: &dyn TextCompletionService,
    stage: PipelineStage,
    system: &str,
    user: &str,
    policy: &CallPolicy,
) -> Result<String> {
    let span = llm_span(stage, service.provider(), service.model());

    async move {
        let (outcome, attempts) = policy
            .retry
            .run(move |_| async move {
                match tokio::time::timeout(policy.timeout, service.complete(system, user)).await {
                    Ok(result) => result,
                    Err(_) => Err(PipelineError::ServiceUnavailable(format!(
                        "{} call timed out after {}ms",
                        stage.as_str(),
                        policy.timeout.as_millis()
                    ))),
                }
            })
            .await;

        record_llm_attempts(attempts);
        outcome
    }
    .instrument(span)
    .await
}
