//! Natural language question to candidate SQL.

use crate::db::SchemaContext;
use crate::llm::{complete_with_policy, CallPolicy, TextCompletionService};
use crate::otel::PipelineStage;
use crate::types::{PipelineError, Result};
use regex::Regex;
use std::sync::{Arc, OnceLock};

/// Generates one candidate query per question.
pub struct QueryGenerator {
    service: Arc<dyn TextCompletionService>,
    policy: CallPolicy,
    top_k: usize,
}

impl QueryGenerator {
    pub fn new(service: Arc<dyn TextCompletionService>, policy: CallPolicy, top_k: usize) -> Self {
        Self {
            service,
            policy,
            top_k,
        }
    }

    /// Convert a question into a candidate SQL string.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::GenerationError` if the service fails or the
    /// answer is empty once labels and code fences are removed
    pub async fn generate(&self, question: &str, schema: &SchemaContext) -> Result<String> {
        let system = system_prompt(&schema.dialect, self.top_k);
        let user = user_prompt(question, schema);
        tracing::debug!(chars = user.len(), "Generation prompt built");

        let raw = complete_with_policy(
            self.service.as_ref(),
            PipelineStage::Generate,
            &system,
            &user,
            &self.policy,
        )
        .await?;

        let candidate = clean_generated(&raw);
        if candidate.is_empty() {
            return Err(PipelineError::generation("model returned no SQL"));
        }

        tracing::debug!(candidate = %candidate, "Candidate query generated");
        Ok(candidate)
    }
}

/// Display name for a dialect identifier.
pub fn dialect_label(dialect: &str) -> String {
    match dialect.to_ascii_lowercase().as_str() {
        "sqlite" => "SQLite".to_string(),
        "postgresql" | "postgres" => "PostgreSQL".to_string(),
        "mysql" => "MySQL".to_string(),
        "mssql" => "SQL Server".to_string(),
        _ => dialect.to_string(),
    }
}

fn system_prompt(dialect: &str, top_k: usize) -> String {
    let label = dialect_label(dialect);
    format!(
        r#"You are a {label} expert. Given an input question, write one syntactically correct {label} query that answers it.

Unless the question asks for a specific number of rows, query for at most {top_k} results using the LIMIT clause as per {label}. Order the results so the most informative rows come first.
Never select all columns of a table; select only the columns needed to answer the question. Wrap each column name in double quotes (") to denote it as a delimited identifier.
Use only the tables and columns listed by the user. Do not query columns that do not exist, and pay attention to which column belongs to which table.
If the question refers to "today", use date('now').

Answer in this format:

Question: the question
SQLQuery: the SQL query to run"#
    )
}

fn user_prompt(question: &str, schema: &SchemaContext) -> String {
    format!(
        "Only use the following tables:\n{}\n\nQuestion: {}\nSQLQuery:",
        schema.render(),
        question
    )
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("static regex")
    })
}

fn label_regex() -> &'static Regex {
    static LABEL: OnceLock<Regex> = OnceLock::new();
    LABEL.get_or_init(|| Regex::new(r"(?i)^\s*SQLQuery:\s*").expect("static regex"))
}

fn result_regex() -> &'static Regex {
    static RESULT: OnceLock<Regex> = OnceLock::new();
    RESULT.get_or_init(|| Regex::new(r"(?is)\s*SQLResult:.*$").expect("static regex"))
}

/// Extract the SQL from a generation answer.
///
/// Handles:
/// - ```sql ... ``` fenced blocks (first block wins)
/// - a leading `SQLQuery:` label
/// - a trailing `SQLResult: ...` section
pub fn clean_generated(text: &str) -> String {
    let text = text.trim();
    let body = fence_regex()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text);

    let body = label_regex().replace(body, "");
    let body = result_regex().replace(&body, "");
    body.trim().to_string()
}
