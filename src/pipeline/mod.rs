//! Question-to-answer orchestration.
//!
//! ```text
//! question
//!   -> open database + schema context      (ConnectionError)
//!   -> generate candidate SQL               (GenerationError)
//!   -> validate candidate                   (GenerationError)
//!   -> read-only guard                      (StatementRejected)
//!   -> execute                              (ExecutionError)
//!   -> format rows
//!   -> ResponseEnvelope
//! ```
//!
//! Every failure is turned into a failure envelope; `handle` never returns an
//! error and never panics on bad input.

pub mod envelope;
pub mod runner;

pub use envelope::ResponseEnvelope;
pub use runner::SqlRunner;

use crate::config::PipelineConfig;
use crate::db::{DatabaseOpener, SqliteOpener};
use crate::format::{format_rows, Record};
use crate::llm::{CallPolicy, LlmClient, QueryGenerator, QueryValidator, TextCompletionService};
use crate::types::{PipelineError, Result};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Stateless orchestrator. Safe to share between concurrent requests.
pub struct Pipeline {
    runner: SqlRunner,
    generator: QueryGenerator,
    validator: QueryValidator,
}

impl Pipeline {
    /// Build a pipeline from explicit collaborators.
    pub fn new(
        config: &PipelineConfig,
        opener: Arc<dyn DatabaseOpener>,
        service: Arc<dyn TextCompletionService>,
    ) -> Self {
        let policy = CallPolicy {
            timeout: config.llm.request_timeout(),
            retry: config.llm.retry.clone(),
        };

        Self {
            runner: SqlRunner::new(config, opener),
            generator: QueryGenerator::new(Arc::clone(&service), policy.clone(), config.top_k),
            validator: QueryValidator::new(service, policy),
        }
    }

    /// SQLite target plus the HTTP client described by `config.llm`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ConfigError` if no API key or base URL is configured
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let client = LlmClient::new(&config.llm)?;
        Ok(Self::new(config, Arc::new(SqliteOpener), Arc::new(client)))
    }

    /// Answer one question.
    pub async fn handle(&self, question: &str) -> ResponseEnvelope {
        let span = tracing::info_span!(
            "pipeline.handle",
            request_id = %Uuid::new_v4(),
            question = %question,
        );

        async move {
            match self.answer(question).await {
                Ok((sql, result)) => {
                    tracing::info!(rows = result.len(), "Question answered");
                    ResponseEnvelope::success(question, sql, result)
                }
                Err(e) => {
                    tracing::warn!(error = %e, kind = e.kind().as_str(), "Question failed");
                    ResponseEnvelope::failure(question, &e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Answer one question and render the envelope as 4-space indented JSON.
    pub async fn handle_json(&self, question: &str) -> String {
        let envelope = self.handle(question).await;
        match envelope.to_json() {
            Ok(text) => text,
            Err(e) => {
                let fallback = ResponseEnvelope::failure(question, &e);
                serde_json::to_string(&fallback).unwrap_or_default()
            }
        }
    }

    async fn answer(&self, question: &str) -> Result<(String, Vec<Record>)> {
        if question.trim().is_empty() {
            return Err(PipelineError::generation("question is empty"));
        }

        let (db, schema) = self.runner.open().await?;
        let candidate = self.generator.generate(question, &schema).await?;
        let validated = self.validator.validate(&candidate, &schema.dialect).await?;

        let rows = self.runner.execute(db, &validated).await?;
        Ok((validated, format_rows(&rows)))
    }
}
