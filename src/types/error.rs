//! Error types for the question-to-SQL pipeline.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for every pipeline stage.
///
/// Messages coming from SQLite or from the LLM provider are forwarded as
/// unstructured text. Use [`PipelineError::kind`] to tell stages apart.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Database file missing, unreadable or not a database
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    /// LLM returned an error, an empty answer or an unparseable body
    #[error("Query generation failed: {0}")]
    GenerationError(String),

    /// LLM endpoint unreachable, timed out, rate limited or 5xx
    #[error("LLM service unavailable: {0}")]
    ServiceUnavailable(String),

    /// SQL execution failed (syntax, missing object, constraint)
    #[error("Query execution failed: {0}")]
    ExecutionError(String),

    /// Statement refused by the read-only guard
    #[error("Statement rejected: {0}")]
    StatementRejected(String),

    /// Result conversion failed (programming defect)
    #[error("Result formatting failed: {0}")]
    FormattingError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Stage classification carried in failure envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connection,
    Generation,
    Execution,
    Rejected,
    Formatting,
    Config,
    Internal,
}

impl ErrorKind {
    /// Get kind name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Generation => "generation",
            Self::Execution => "execution",
            Self::Rejected => "rejected",
            Self::Formatting => "formatting",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }
}

impl PipelineError {
    /// Create a generation error with context.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::GenerationError(msg.into())
    }

    /// Create an execution error with context.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::ExecutionError(msg.into())
    }

    /// Create a connection error with context.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Pipeline stage this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionError(_) => ErrorKind::Connection,
            Self::GenerationError(_) | Self::ServiceUnavailable(_) => ErrorKind::Generation,
            Self::ExecutionError(_) => ErrorKind::Execution,
            Self::StatementRejected(_) => ErrorKind::Rejected,
            Self::FormattingError(_) => ErrorKind::Formatting,
            Self::ConfigError(_) => ErrorKind::Config,
            Self::JsonError(_) | Self::IoError(_) => ErrorKind::Internal,
        }
    }

    /// Check if error is recoverable.
    ///
    /// # Returns
    ///
    /// `true` if the operation can be retried (transient LLM failure), `false` otherwise
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }
}
