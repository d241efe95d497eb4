//! Tracing spans following OpenTelemetry semantic conventions.
//!
//! # Database spans
//!
//! - https://opentelemetry.io/docs/specs/semconv/database/database-spans/
//! - `db.system.name`: always `"sqlite"`
//! - `db.namespace`: database file path
//! - `db.query.text`: statement as executed
//!
//! # LLM spans
//!
//! - https://opentelemetry.io/docs/specs/semconv/gen-ai/gen-ai-spans/
//! - `gen_ai.operation.name`: `"chat"`
//! - `gen_ai.system`: provider (`anthropic`, `openai`, ...)
//! - `gen_ai.request.model`: model name
//!
//! # Example
//!
//! ```rust,ignore
//! use percolate_sql::otel::db_query_span;
//!
//! let span = db_query_span("SELECT * FROM defects", "data/records.db");
//! let _guard = span.enter();
//! ```

pub mod db;
pub mod llm;

pub use db::{db_query_span, record_db_metrics};
pub use llm::{llm_span, record_llm_attempts, record_llm_usage, PipelineStage};
