//! Response envelope returned for every question.

use crate::format::Record;
use crate::types::{ErrorKind, PipelineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::ser::{PrettyFormatter, Serializer};

/// Exactly one of `result` or `error` is present.
///
/// ```json
/// {"user_question": "...", "sql_query": "...", "result": [{"name": "Brake noise"}]}
/// {"user_question": "...", "error": "...", "error_kind": "execution"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Success {
        user_question: String,
        sql_query: String,
        result: Vec<Record>,
    },
    Failure {
        user_question: String,
        error: String,
        error_kind: ErrorKind,
    },
}

impl ResponseEnvelope {
    pub fn success(question: impl Into<String>, sql: impl Into<String>, result: Vec<Record>) -> Self {
        Self::Success {
            user_question: question.into(),
            sql_query: sql.into(),
            result,
        }
    }

    pub fn failure(question: impl Into<String>, error: &PipelineError) -> Self {
        Self::Failure {
            user_question: question.into(),
            error: error.to_string(),
            error_kind: error.kind(),
        }
    }

    pub fn user_question(&self) -> &str {
        match self {
            Self::Success { user_question, .. } | Self::Failure { user_question, .. } => user_question,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Rows of a successful answer.
    pub fn result(&self) -> Option<&[Record]> {
        match self {
            Self::Success { result, .. } => Some(result),
            Self::Failure { .. } => None,
        }
    }

    /// Error text of a failed answer.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error_kind, .. } => Some(*error_kind),
        }
    }

    /// Render as JSON indented by four spaces.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::with_capacity(256);
        let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.serialize(&mut serializer)?;
        String::from_utf8(buf).map_err(|e| PipelineError::FormattingError(e.to_string()))
    }
}
