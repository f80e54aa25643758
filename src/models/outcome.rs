//! Execution outcome models.

use serde_json::Value as JsonValue;

/// One result row, with columns kept in the order the database returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, JsonValue)>,
}

impl Record {
    pub fn new(fields: Vec<(String, JsonValue)>) -> Self {
        Self { fields }
    }

    /// Look up a column value by name (exact match).
    pub fn get(&self, column: &str) -> Option<&JsonValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn values(&self) -> impl Iterator<Item = &JsonValue> {
        self.fields.iter().map(|(_, value)| value)
    }
}

impl FromIterator<(String, JsonValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, JsonValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Result of running one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// Rows fetched from a SELECT or a `RETURNING` clause (possibly none).
    Rows(Vec<Record>),
    /// Statement completed without producing rows.
    Success,
}

impl ExecutionOutcome {
    pub fn rows(&self) -> Option<&[Record]> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Success => None,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows().map_or(0, <[Record]>::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Record {
        Record::new(vec![
            ("id".to_string(), json!(1)),
            ("name".to_string(), json!("Suite")),
        ])
    }

    #[test]
    fn test_record_lookup_and_order() {
        let record = sample();
        assert_eq!(record.get("name"), Some(&json!("Suite")));
        assert_eq!(record.get("missing"), None);
        assert_eq!(
            record.values().cloned().collect::<Vec<_>>(),
            vec![json!(1), json!("Suite")]
        );
    }

    #[test]
    fn test_outcome_row_count() {
        assert_eq!(ExecutionOutcome::Rows(vec![sample(), sample()]).row_count(), 2);
        assert_eq!(ExecutionOutcome::Rows(Vec::new()).row_count(), 0);
        assert_eq!(ExecutionOutcome::Success.row_count(), 0);
        assert!(ExecutionOutcome::Success.rows().is_none());
    }
}
