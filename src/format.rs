//! Result formatter: raw rows to JSON-safe records.
//!
//! Pure and total. Every row becomes an ordered `column -> scalar` map:
//!
//! | SQLite value | JSON |
//! |--------------|------|
//! | NULL | `null` |
//! | INTEGER | number |
//! | REAL | number (NaN/inf as string) |
//! | TEXT | string |
//! | BLOB | lowercase hex string |
//!
//! A column name repeated within one row (`SELECT a, a FROM t`) keeps the
//! first occurrence as is; later ones get `_1`, `_2`, ... appended.

use crate::db::{RowSet, SqlValue};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::HashSet;

/// One formatted row.
pub type Record = Map<String, JsonValue>;

/// Convert a row set into JSON records. Empty input yields an empty vector.
pub fn format_rows(rows: &RowSet) -> Vec<Record> {
    if rows.rows.is_empty() {
        return Vec::new();
    }

    let keys = unique_keys(&rows.columns);
    rows.rows
        .iter()
        .map(|row| {
            keys.iter()
                .zip(row.iter())
                .map(|(key, value)| (key.clone(), to_json(value)))
                .collect()
        })
        .collect()
}

/// Convert a single engine value.
pub fn to_json(value: &SqlValue) -> JsonValue {
    match value {
        SqlValue::Null => JsonValue::Null,
        SqlValue::Integer(i) => JsonValue::Number((*i).into()),
        SqlValue::Real(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(f.to_string())),
        SqlValue::Text(s) => JsonValue::String(s.clone()),
        SqlValue::Blob(bytes) => JsonValue::String(hex(bytes)),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn unique_keys(columns: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(columns.len());
    let mut keys = Vec::with_capacity(columns.len());

    for column in columns {
        let mut key = column.clone();
        let mut suffix = 1;
        while seen.contains(&key) {
            key = format!("{}_{}", column, suffix);
            suffix += 1;
        }
        seen.insert(key.clone());
        keys.push(key);
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn row_set(columns: &[&str], rows: Vec<Vec<SqlValue>>) -> RowSet {
        RowSet {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn test_empty_rows() {
        assert!(format_rows(&RowSet::default()).is_empty());
        assert!(format_rows(&row_set(&["name"], vec![])).is_empty());
    }

    #[test]
    fn test_scalar_conversion() {
        let rows = row_set(
            &["name", "failure_count", "cost", "note", "photo"],
            vec![vec![
                SqlValue::Text("Brake noise".into()),
                SqlValue::Integer(41),
                SqlValue::Real(120.5),
                SqlValue::Null,
                SqlValue::Blob(vec![0x0a, 0xff]),
            ]],
        );

        let records = format_rows(&rows);
        assert_eq!(
            JsonValue::Object(records[0].clone()),
            json!({
                "name": "Brake noise",
                "failure_count": 41,
                "cost": 120.5,
                "note": null,
                "photo": "0aff"
            })
        );
    }

    #[test]
    fn test_column_order_preserved() {
        let rows = row_set(
            &["z", "a", "m"],
            vec![vec![SqlValue::Integer(1), SqlValue::Integer(2), SqlValue::Integer(3)]],
        );
        let formatted = format_rows(&rows);
        let keys: Vec<&String> = formatted[0].keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_non_finite_real_becomes_string() {
        assert_eq!(to_json(&SqlValue::Real(f64::INFINITY)), json!("inf"));
        assert_eq!(to_json(&SqlValue::Real(f64::NAN)), json!("NaN"));
    }

    #[test]
    fn test_duplicate_columns_disambiguated() {
        let rows = row_set(
            &["name", "name", "name_1"],
            vec![vec![
                SqlValue::Text("a".into()),
                SqlValue::Text("b".into()),
                SqlValue::Text("c".into()),
            ]],
        );
        let records = format_rows(&rows);
        let keys: Vec<&String> = records[0].keys().collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(records[0]["name"], json!("a"));
        assert_eq!(records[0]["name_1"], json!("b"));
        assert_eq!(records[0]["name_1_1"], json!("c"));
    }

    fn sql_value() -> impl Strategy<Value = SqlValue> {
        prop_oneof![
            Just(SqlValue::Null),
            any::<i64>().prop_map(SqlValue::Integer),
            any::<f64>().prop_map(SqlValue::Real),
            ".{0,20}".prop_map(SqlValue::Text),
            proptest::collection::vec(any::<u8>(), 0..8).prop_map(SqlValue::Blob),
        ]
    }

    fn row_set_strategy() -> impl Strategy<Value = RowSet> {
        (1usize..5).prop_flat_map(|width| {
            (
                proptest::collection::vec("[a-c]{1,2}", width),
                proptest::collection::vec(proptest::collection::vec(sql_value(), width), 0..6),
            )
                .prop_map(|(columns, rows)| RowSet { columns, rows })
        })
    }

    proptest! {
        #[test]
        fn prop_format_is_deterministic(rows in row_set_strategy()) {
            prop_assert_eq!(format_rows(&rows), format_rows(&rows));
        }

        #[test]
        fn prop_one_record_per_row_and_one_key_per_column(rows in row_set_strategy()) {
            let records = format_rows(&rows);
            prop_assert_eq!(records.len(), rows.rows.len());
            for record in &records {
                prop_assert_eq!(record.len(), rows.columns.len());
            }
        }
    }
}
