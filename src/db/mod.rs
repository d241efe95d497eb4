//! Database accessor.
//!
//! The pipeline talks to the relational store through two small traits:
//! [`DatabaseOpener`] yields one [`SqlDatabase`] handle per request, and the
//! handle exposes dialect, schema context and `run`. [`SqliteOpener`] is the
//! production implementation; tests substitute fakes.

pub mod guard;
pub mod schema;
pub mod sqlite;

pub use guard::{check_read_only, GuardVerdict};
pub use schema::{ColumnInfo, SchemaContext, TableInfo};
pub use sqlite::{SqliteDatabase, SqliteOpener};

use crate::types::Result;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Scalar value returned by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

/// Rows produced by one statement. Every row has `columns.len()` values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowSet {
    /// Column names in SELECT order (may contain duplicates)
    pub columns: Vec<String>,

    /// Row values, ordered as returned by the engine
    pub rows: Vec<Vec<SqlValue>>,
}

impl RowSet {
    /// Row set with the given columns and no rows.
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Interrupts the statement currently running on a handle.
pub type Canceller = Arc<dyn Fn() + Send + Sync>;

/// Options applied when a handle is opened.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenOptions {
    /// Open without write access
    pub read_only: bool,

    /// How long to wait on a locked database
    pub busy_timeout: Duration,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            read_only: true,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// An open connection to the target database.
pub trait SqlDatabase: Send {
    /// SQL dialect spoken by the engine (e.g. `"sqlite"`).
    fn dialect(&self) -> &str;

    /// Table and column metadata plus up to `sample_rows` example rows per table.
    fn schema_context(&self, sample_rows: usize) -> Result<SchemaContext>;

    /// Execute `sql` exactly as given.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ExecutionError` carrying the engine's message
    fn run(&self, sql: &str) -> Result<RowSet>;

    /// Hook to interrupt a running statement from another thread.
    fn canceller(&self) -> Option<Canceller> {
        None
    }
}

/// Opens handles for a connection target.
pub trait DatabaseOpener: Send + Sync {
    /// # Errors
    ///
    /// Returns `PipelineError::ConnectionError` if the target is unreachable or malformed
    fn open(&self, target: &Path, options: &OpenOptions) -> Result<Box<dyn SqlDatabase>>;
}
