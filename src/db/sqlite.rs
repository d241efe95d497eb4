//! SQLite implementation of the database accessor.

use crate::db::schema::{ColumnInfo, SchemaContext, TableInfo};
use crate::db::{Canceller, DatabaseOpener, OpenOptions, RowSet, SqlDatabase, SqlValue};
use crate::otel::{db_query_span, record_db_metrics};
use crate::types::{PipelineError, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Dialect name reported to the generator and validator.
pub const SQLITE_DIALECT: &str = "sqlite";

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(t) => SqlValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => SqlValue::Blob(b.to_vec()),
        }
    }
}

fn exec_err(e: rusqlite::Error) -> PipelineError {
    PipelineError::ExecutionError(e.to_string())
}

/// Failures while reading metadata belong to the connection stage.
fn schema_err(e: rusqlite::Error) -> PipelineError {
    PipelineError::ConnectionError(format!("reading schema: {}", e))
}

/// Quote an identifier for interpolation into SQL text.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// One SQLite connection, owned by a single request.
pub struct SqliteDatabase {
    conn: Connection,
    path: PathBuf,
    read_only: bool,
}

impl SqliteDatabase {
    /// Open an existing database file.
    ///
    /// Never creates the file. SQLite opens lazily, so the schema table is read
    /// once here to make a non-database file fail at open time.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ConnectionError` if the file is missing, unreadable
    /// or not a SQLite database
    pub fn open(path: &Path, options: &OpenOptions) -> Result<Self> {
        if !path.is_file() {
            return Err(PipelineError::connection(format!(
                "database file not found: {}",
                path.display()
            )));
        }

        let access = if options.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        let conn = Connection::open_with_flags(path, access | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .map_err(|e| PipelineError::connection(format!("{}: {}", path.display(), e)))?;

        conn.busy_timeout(options.busy_timeout)
            .map_err(|e| PipelineError::connection(e.to_string()))?;

        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|e| PipelineError::connection(format!("{}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), read_only = options.read_only, "Opened database");

        Ok(Self {
            conn,
            path: path.to_path_buf(),
            read_only: options.read_only,
        })
    }

    fn query_rows(&self, sql: &str) -> Result<RowSet> {
        let mut stmt = self.conn.prepare(sql).map_err(exec_err)?;

        // The read-only open flag does not cover VACUUM INTO and similar
        // statements that write outside the main file.
        if self.read_only && !stmt.readonly() {
            return Err(PipelineError::StatementRejected(
                "read-only mode refuses statements that write".to_string(),
            ));
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        if columns.is_empty() {
            let affected = stmt.execute([]).map_err(exec_err)?;
            record_db_metrics(None, Some(affected));
            return Ok(RowSet::default());
        }

        let mut result = RowSet::with_columns(columns);
        let width = result.columns.len();
        let mut rows = stmt.query([]).map_err(exec_err)?;
        while let Some(row) = rows.next().map_err(exec_err)? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(SqlValue::from(row.get_ref(idx).map_err(exec_err)?));
            }
            result.rows.push(values);
        }

        record_db_metrics(Some(result.len()), None);
        Ok(result)
    }

    fn table_columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))
            .map_err(schema_err)?;

        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    data_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    not_null: row.get::<_, i64>(3)? != 0,
                    primary_key: row.get::<_, i64>(5)? > 0,
                })
            })
            .map_err(schema_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(schema_err)?;

        Ok(columns)
    }
}

impl SqlDatabase for SqliteDatabase {
    fn dialect(&self) -> &str {
        SQLITE_DIALECT
    }

    fn schema_context(&self, sample_rows: usize) -> Result<SchemaContext> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT name, sql FROM sqlite_master \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .map_err(schema_err)?;

        let entries = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .map_err(schema_err)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(schema_err)?;

        let mut tables = Vec::with_capacity(entries.len());
        for (name, create_sql) in entries {
            let columns = self.table_columns(&name)?;
            let sample = if sample_rows > 0 {
                self.query_rows(&format!(
                    "SELECT * FROM {} LIMIT {}",
                    quote_identifier(&name),
                    sample_rows
                ))
                .map_err(|e| match e {
                    PipelineError::ExecutionError(msg) => {
                        PipelineError::ConnectionError(format!("reading schema: {}", msg))
                    }
                    other => other,
                })?
            } else {
                RowSet::default()
            };

            tables.push(TableInfo {
                name,
                create_sql: create_sql.unwrap_or_default(),
                columns,
                sample,
            });
        }

        Ok(SchemaContext {
            dialect: SQLITE_DIALECT.to_string(),
            tables,
        })
    }

    fn run(&self, sql: &str) -> Result<RowSet> {
        let span = db_query_span(sql, &self.path.display().to_string());
        let _guard = span.enter();
        self.query_rows(sql)
    }

    fn canceller(&self) -> Option<Canceller> {
        let handle = self.conn.get_interrupt_handle();
        Some(Arc::new(move || handle.interrupt()))
    }
}

/// Opens [`SqliteDatabase`] handles.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteOpener;

impl DatabaseOpener for SqliteOpener {
    fn open(&self, target: &Path, options: &OpenOptions) -> Result<Box<dyn SqlDatabase>> {
        Ok(Box::new(SqliteDatabase::open(target, options)?))
    }
}
