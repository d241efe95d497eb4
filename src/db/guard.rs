//! Read-only statement guard.
//!
//! Parses the validated query with the SQLite dialect and refuses anything that
//! is not a plain query. Text that does not parse is let through untouched: the
//! engine reports its own error and the caller sees it verbatim.

use crate::types::{PipelineError, Result};
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

/// Outcome of a successful guard check.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardVerdict {
    /// Every statement is a read-only query
    ReadOnly,
    /// Not parseable as SQL; forwarded to the engine as-is
    Unparsed(String),
}

/// Check that `sql` only reads.
///
/// # Errors
///
/// Returns `PipelineError::StatementRejected` naming the first statement that
/// could modify the database (DML, DDL, PRAGMA, ATTACH, transaction control, ...)
pub fn check_read_only(sql: &str) -> Result<GuardVerdict> {
    let statements = match Parser::parse_sql(&SQLiteDialect {}, sql) {
        Ok(statements) => statements,
        Err(e) => {
            tracing::debug!(error = %e, "Query text did not parse, forwarding to engine");
            return Ok(GuardVerdict::Unparsed(e.to_string()));
        }
    };

    if statements.is_empty() {
        return Ok(GuardVerdict::Unparsed("no statements".to_string()));
    }

    for statement in &statements {
        if !is_read_only_statement(statement) {
            return Err(PipelineError::StatementRejected(format!(
                "read-only mode refuses {} statements",
                statement_keyword(statement)
            )));
        }
    }

    Ok(GuardVerdict::ReadOnly)
}

fn is_read_only_statement(statement: &Statement) -> bool {
    match statement {
        Statement::Query(query) => is_read_only_query(query),
        Statement::Explain { statement, .. } => is_read_only_statement(statement),
        _ => false,
    }
}

fn is_read_only_query(query: &Query) -> bool {
    let ctes_read_only = query
        .with
        .as_ref()
        .map(|with| with.cte_tables.iter().all(|cte| is_read_only_query(&cte.query)))
        .unwrap_or(true);

    ctes_read_only && is_read_only_set_expr(&query.body)
}

fn is_read_only_set_expr(expr: &SetExpr) -> bool {
    match expr {
        SetExpr::Select(_) | SetExpr::Values(_) => true,
        SetExpr::Query(query) => is_read_only_query(query),
        SetExpr::SetOperation { left, right, .. } => {
            is_read_only_set_expr(left) && is_read_only_set_expr(right)
        }
        _ => false,
    }
}

/// Leading keyword of a statement, for error messages.
fn statement_keyword(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or("unknown")
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selects_pass() {
        for sql in [
            "SELECT name, failure_count FROM defects ORDER BY failure_count DESC LIMIT 20",
            "SELECT \"name\" FROM \"defects\";",
            "WITH top AS (SELECT * FROM defects) SELECT count(*) FROM top",
            "SELECT a FROM t UNION ALL SELECT b FROM u",
            "SELECT (SELECT max(x) FROM t) AS m",
        ] {
            assert_eq!(check_read_only(sql).unwrap(), GuardVerdict::ReadOnly, "{}", sql);
        }
    }

    #[test]
    fn test_writes_rejected() {
        for (sql, keyword) in [
            ("DELETE FROM defects", "DELETE"),
            ("INSERT INTO defects VALUES ('x', 1)", "INSERT"),
            ("UPDATE defects SET failure_count = 0", "UPDATE"),
            ("DROP TABLE defects", "DROP"),
            ("CREATE TABLE x (a INT)", "CREATE"),
            ("SELECT 1; DELETE FROM defects", "DELETE"),
        ] {
            match check_read_only(sql) {
                Err(PipelineError::StatementRejected(msg)) => {
                    assert!(msg.contains(keyword), "{} -> {}", sql, msg)
                }
                other => panic!("{} should be rejected, got {:?}", sql, other),
            }
        }
    }

    #[test]
    fn test_prose_is_forwarded_unparsed() {
        let verdict =
            check_read_only("I'm sorry, I cannot answer that question with the given tables.")
                .unwrap();
        assert!(matches!(verdict, GuardVerdict::Unparsed(_)));
    }

    #[test]
    fn test_empty_text_is_forwarded() {
        assert!(matches!(check_read_only("   ").unwrap(), GuardVerdict::Unparsed(_)));
    }
}
