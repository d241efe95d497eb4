//! Core data types shared by every pipeline stage.
//!
//! - `PipelineError`: Error type for all operations
//! - `ErrorKind`: Stage tag carried in failure envelopes
//! - `Result`: Convenient result type alias

pub mod error;

pub use error::{ErrorKind, PipelineError};

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;
