//! Percolate SQL - natural language questions answered from a relational store
//!
//! One question runs one sequential chain:
//! - schema context read from the target database (SQLite)
//! - candidate query generated by an LLM
//! - candidate double-checked by a second LLM call
//! - validated query executed (read-only by default)
//! - rows converted to JSON records and wrapped in a response envelope
//!
//! Can be used as:
//! - Rust library ([`Pipeline`])
//! - CLI (`p8-sql ask "..."`)

pub mod types;
pub mod config;
pub mod db;
pub mod llm;
pub mod format;
pub mod otel;
pub mod pipeline;

pub use config::{LlmConfig, PipelineConfig};
pub use pipeline::{Pipeline, ResponseEnvelope};
pub use types::{ErrorKind, PipelineError, Result};
