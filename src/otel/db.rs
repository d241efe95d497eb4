//! Database operation instrumentation.

use tracing::{field, span, Level, Span};

/// Create database query span.
///
/// # Arguments
///
/// * `query_text` - SQL statement as executed
/// * `namespace` - Database file path
///
/// # Returns
///
/// Tracing span with query attributes
pub fn db_query_span(query_text: &str, namespace: &str) -> Span {
    span!(
        Level::INFO,
        "db.query",
        otel.name = "query sqlite",
        otel.kind = "client",
        db.system.name = "sqlite",
        db.operation.name = "query",
        db.namespace = namespace,
        db.query.text = query_text,
        db.response.returned_rows = field::Empty,
        db.response.affected_rows = field::Empty,
    )
}

/// Record row counts in the current span.
///
/// # Arguments
///
/// * `rows_returned` - Rows produced by a query (optional)
/// * `rows_affected` - Rows modified by a statement (optional)
pub fn record_db_metrics(rows_returned: Option<usize>, rows_affected: Option<usize>) {
    let span = Span::current();
    if let Some(returned) = rows_returned {
        span.record("db.response.returned_rows", returned);
    }
    if let Some(affected) = rows_affected {
        span.record("db.response.affected_rows", affected);
    }
}
