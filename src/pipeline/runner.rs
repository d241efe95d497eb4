//! Blocking database work moved off the async runtime.

use crate::config::PipelineConfig;
use crate::db::{check_read_only, DatabaseOpener, GuardVerdict, OpenOptions, RowSet, SchemaContext, SqlDatabase};
use crate::format::{format_rows, Record};
use crate::types::{PipelineError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;

/// Opens the configured database and executes statements against it.
///
/// One connection per [`SqlRunner::open`]; nothing is pooled or cached.
#[derive(Clone)]
pub struct SqlRunner {
    opener: Arc<dyn DatabaseOpener>,
    target: PathBuf,
    options: OpenOptions,
    sample_rows: usize,
    query_timeout: Duration,
}

impl SqlRunner {
    pub fn new(config: &PipelineConfig, opener: Arc<dyn DatabaseOpener>) -> Self {
        Self {
            opener,
            target: config.db_path.clone(),
            options: OpenOptions {
                read_only: config.read_only,
                busy_timeout: config.busy_timeout(),
            },
            sample_rows: config.sample_rows,
            query_timeout: config.query_timeout(),
        }
    }

    /// Open a handle and read its schema context.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ConnectionError` if the target cannot be opened
    pub async fn open(&self) -> Result<(Box<dyn SqlDatabase>, SchemaContext)> {
        let opener = Arc::clone(&self.opener);
        let target = self.target.clone();
        let options = self.options;
        let sample_rows = self.sample_rows;

        tokio::task::spawn_blocking(move || {
            let db = opener.open(&target, &options)?;
            let schema = db.schema_context(sample_rows)?;
            tracing::debug!(tables = ?schema.table_names(), dialect = %schema.dialect, "Schema context loaded");
            Ok((db, schema))
        })
        .await
        .map_err(join_error)?
    }

    /// Schema context of the configured target.
    pub async fn schema(&self) -> Result<SchemaContext> {
        let (_db, schema) = self.open().await?;
        Ok(schema)
    }

    /// Open the target, run `sql` and format the rows. No model involved.
    ///
    /// The read-only guard still applies.
    pub async fn query(&self, sql: &str) -> Result<Vec<Record>> {
        let (db, _schema) = self.open().await?;
        let rows = self.execute(db, sql).await?;
        Ok(format_rows(&rows))
    }

    /// Guard (when read-only) and run `sql` on `db`, bounded by the query timeout.
    ///
    /// On timeout the statement is interrupted and the handle is dropped on
    /// the blocking thread once the engine returns.
    ///
    /// # Errors
    ///
    /// - `PipelineError::StatementRejected` if the guard refuses the statement
    /// - `PipelineError::ExecutionError` with the engine message, or on timeout
    pub async fn execute(&self, db: Box<dyn SqlDatabase>, sql: &str) -> Result<RowSet> {
        if self.options.read_only {
            if let GuardVerdict::Unparsed(reason) = check_read_only(sql)? {
                tracing::debug!(reason = %reason, "Guard could not parse query");
            }
        }

        let canceller = db.canceller();
        let sql = sql.to_string();
        let task = tokio::task::spawn_blocking(move || db.run(&sql));

        match tokio::time::timeout(self.query_timeout, task).await {
            Ok(joined) => joined.map_err(join_error)?,
            Err(_) => {
                if let Some(cancel) = canceller {
                    cancel();
                }
                tracing::warn!(timeout_ms = self.query_timeout.as_millis() as u64, "Query interrupted");
                Err(PipelineError::execution(format!(
                    "query timed out after {}ms",
                    self.query_timeout.as_millis()
                )))
            }
        }
    }
}

fn join_error(e: JoinError) -> PipelineError {
    PipelineError::IoError(std::io::Error::other(format!("database task failed: {}", e)))
}
