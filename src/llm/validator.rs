//! LLM self-check of a candidate query.
//!
//! No parsing happens here: the model's answer replaces the candidate verbatim.

use crate::llm::generator::dialect_label;
use crate::llm::{complete_with_policy, CallPolicy, TextCompletionService};
use crate::otel::PipelineStage;
use crate::types::{PipelineError, Result};
use std::sync::Arc;

pub struct QueryValidator {
    service: Arc<dyn TextCompletionService>,
    policy: CallPolicy,
}

impl QueryValidator {
    pub fn new(service: Arc<dyn TextCompletionService>, policy: CallPolicy) -> Self {
        Self { service, policy }
    }

    /// Ask the model to double check `candidate` for `dialect`.
    ///
    /// # Returns
    ///
    /// The model output, untouched
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::GenerationError` if the service fails or answers
    /// with whitespace only
    pub async fn validate(&self, candidate: &str, dialect: &str) -> Result<String> {
        let system = critique_prompt(dialect);
        let validated = complete_with_policy(
            self.service.as_ref(),
            PipelineStage::Validate,
            &system,
            candidate,
            &self.policy,
        )
        .await?;

        if validated.trim().is_empty() {
            return Err(PipelineError::generation("validator returned no text"));
        }

        if validated.trim() != candidate.trim() {
            tracing::info!(candidate = %candidate, validated = %validated, "Validator rewrote query");
        }
        Ok(validated)
    }
}

fn critique_prompt(dialect: &str) -> String {
    format!(
        "Double check the user's {} query for common mistakes, including:
- Using NOT IN with NULL values
- Using UNION when UNION ALL should have been used
- Using BETWEEN for exclusive ranges
- Data type mismatch in predicates
- Properly quoting identifiers
- Using the correct number of arguments for functions
- Casting to the correct data type
- Using the proper columns for joins

If there are any of the above mistakes, rewrite the query. If there are no mistakes, just reproduce the original query.

Output the final SQL query only.",
        dialect_label(dialect)
    )
}
