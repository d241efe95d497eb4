//! Schema context handed to the query generator.

use crate::db::{RowSet, SqlValue};
use serde::Serialize;

/// Longest sample value shown in the prompt.
const MAX_SAMPLE_CHARS: usize = 100;

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type, empty when the column has none
    pub data_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

/// One user table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableInfo {
    pub name: String,

    /// `CREATE TABLE` statement as stored by the engine
    pub create_sql: String,

    pub columns: Vec<ColumnInfo>,

    /// Example rows
    #[serde(skip)]
    pub sample: RowSet,
}

/// Dialect plus table metadata, read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaContext {
    pub dialect: String,
    pub tables: Vec<TableInfo>,
}

impl SchemaContext {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Render tables as prompt text.
    ///
    /// Each table contributes its CREATE statement followed by a comment
    /// block with the sample rows, tab separated:
    ///
    /// ```text
    /// CREATE TABLE defects (name TEXT, failure_count INTEGER)
    ///
    /// /*
    /// 2 rows from defects table:
    /// name	failure_count
    /// Brake noise	41
    /// Door seal	12
    /// */
    /// ```
    pub fn render(&self) -> String {
        self.tables
            .iter()
            .map(TableInfo::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl TableInfo {
    fn render(&self) -> String {
        let mut out = self.create_sql.trim().to_string();
        if self.sample.is_empty() {
            return out;
        }

        out.push_str(&format!(
            "\n\n/*\n{} rows from {} table:\n{}\n",
            self.sample.len(),
            self.name,
            self.sample.columns.join("\t")
        ));
        for row in &self.sample.rows {
            let line = row.iter().map(sample_text).collect::<Vec<_>>().join("\t");
            out.push_str(&line);
            out.push('\n');
        }
        out.push_str("*/");
        out
    }
}

fn sample_text(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => "NULL".to_string(),
        SqlValue::Integer(i) => i.to_string(),
        SqlValue::Real(f) => f.to_string(),
        SqlValue::Text(s) => {
            if s.chars().count() > MAX_SAMPLE_CHARS {
                s.chars().take(MAX_SAMPLE_CHARS).collect()
            } else {
                s.clone()
            }
        }
        SqlValue::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}
