//! Output formatting for MCP tools.
//!
//! Results reach the agent as plain text: one line per record, each record
//! written as a tuple of its values in column order, e.g.
//! `(1, 1, 5, '2025-03-15', 100.0)`.

use crate::models::{ExecutionOutcome, Record};
use serde_json::Value as JsonValue;

pub const NO_RECORDS_FOUND: &str = "No records found.";
pub const NO_RESULTS_FOUND: &str = "No results found.";
pub const OPERATION_COMPLETED: &str = "Operation completed successfully.";
pub const RECORD_CREATED_PREFIX: &str = "Record created: ";

/// Which literal an empty row set is reported with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyResultStyle {
    /// `database_query` tool
    Records,
    /// `sql_query_executor` tool
    Results,
}

impl EmptyResultStyle {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Records => NO_RECORDS_FOUND,
            Self::Results => NO_RESULTS_FOUND,
        }
    }
}

pub fn format_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => "NULL".to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => quote_text(s),
        JsonValue::Array(arr) => serde_json::to_string(arr).unwrap_or_default(),
        JsonValue::Object(obj) => serde_json::to_string(obj).unwrap_or_default(),
    }
}

/// Single quotes unless the text contains one and no double quote.
fn quote_text(s: &str) -> String {
    if s.contains('\'') && !s.contains('"') {
        return format!("\"{}\"", s.replace('\\', "\\\\"));
    }
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

pub fn format_record(record: &Record) -> String {
    let values: Vec<String> = record.values().map(format_value).collect();
    match values.as_slice() {
        [single] => format!("({},)", single),
        _ => format!("({})", values.join(", ")),
    }
}

pub fn format_outcome(outcome: &ExecutionOutcome, style: EmptyResultStyle) -> String {
    match outcome {
        ExecutionOutcome::Rows(rows) if rows.is_empty() => style.message().to_string(),
        ExecutionOutcome::Rows(rows) => rows
            .iter()
            .map(format_record)
            .collect::<Vec<_>>()
            .join("\n"),
        ExecutionOutcome::Success => OPERATION_COMPLETED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(values: Vec<JsonValue>) -> Record {
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (format!("c{}", i), v))
            .collect()
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&json!(null)), "NULL");
        assert_eq!(format_value(&json!(true)), "true");
        assert_eq!(format_value(&json!(42)), "42");
        assert_eq!(format_value(&json!(100.0)), "100.0");
        assert_eq!(format_value(&json!("Suite")), "'Suite'");
        assert_eq!(format_value(&json!("it's")), "\"it's\"");
        assert_eq!(format_value(&json!("a'b\"c")), "'a\\'b\"c'");
        assert_eq!(format_value(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_format_record() {
        let row = record(vec![
            json!(1),
            json!(1),
            json!(5),
            json!("2025-03-15"),
            json!(100.0),
        ]);
        assert_eq!(format_record(&row), "(1, 1, 5, '2025-03-15', 100.0)");
        assert_eq!(format_record(&record(vec![json!(1)])), "(1,)");
        assert_eq!(format_record(&Record::default()), "()");
    }

    #[test]
    fn test_format_outcome_empty_styles() {
        let empty = ExecutionOutcome::Rows(Vec::new());
        assert_eq!(
            format_outcome(&empty, EmptyResultStyle::Records),
            "No records found."
        );
        assert_eq!(
            format_outcome(&empty, EmptyResultStyle::Results),
            "No results found."
        );
    }

    #[test]
    fn test_format_outcome_rows_and_success() {
        let rows = ExecutionOutcome::Rows(vec![
            record(vec![json!(1), json!("a")]),
            record(vec![json!(2), json!(null)]),
        ]);
        assert_eq!(
            format_outcome(&rows, EmptyResultStyle::Records),
            "(1, 'a')\n(2, NULL)"
        );
        assert_eq!(
            format_outcome(&ExecutionOutcome::Success, EmptyResultStyle::Results),
            "Operation completed successfully."
        );
    }
}
