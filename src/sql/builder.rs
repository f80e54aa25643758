//! Operation descriptor to SQL compilation.
//!
//! Validation happens in three passes: the operation type, the presence of
//! the fields that operation needs, then every identifier and value against
//! the schema registry. Only names taken from the registry reach the SQL text.

use crate::db::schema::{ColumnDef, SchemaRegistry, TableDef};
use crate::db::types::TypeCategory;
use crate::error::ValidationError;
use crate::models::{DatabaseType, OperationDescriptor, OperationType, ScalarValue};
use crate::sql::statement::{Parameter, SqlStatement};
use std::collections::BTreeMap;

const FILTER_PARAM: &str = "filter_value";

/// A descriptor that passed validation, compiled for one dialect.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledOperation {
    pub operation: OperationType,
    pub table: String,
    pub statement: SqlStatement,
}

/// Descriptor fields checked for presence, borrowed from the request.
#[derive(Debug)]
enum Request<'d> {
    Find {
        filter: (&'d str, &'d str),
    },
    Create {
        data: &'d BTreeMap<String, ScalarValue>,
    },
    Update {
        filter: (&'d str, &'d str),
        data: &'d BTreeMap<String, ScalarValue>,
    },
    Delete {
        filter: (&'d str, &'d str),
    },
}

impl<'d> Request<'d> {
    fn from_descriptor(descriptor: &'d OperationDescriptor) -> Result<Self, ValidationError> {
        let operation: OperationType = descriptor.operation_type.parse()?;
        match operation {
            OperationType::Find => descriptor
                .filter()
                .map(|filter| Self::Find { filter })
                .ok_or(ValidationError::FindFieldsRequired),
            OperationType::Create => descriptor
                .data()
                .map(|data| Self::Create { data })
                .ok_or(ValidationError::CreateDataRequired),
            OperationType::Update => match (descriptor.filter(), descriptor.data()) {
                (Some(filter), Some(data)) => Ok(Self::Update { filter, data }),
                _ => Err(ValidationError::UpdateFieldsRequired),
            },
            OperationType::Delete => descriptor
                .filter()
                .map(|filter| Self::Delete { filter })
                .ok_or(ValidationError::DeleteFieldsRequired),
        }
    }

    fn operation(&self) -> OperationType {
        match self {
            Self::Find { .. } => OperationType::Find,
            Self::Create { .. } => OperationType::Create,
            Self::Update { .. } => OperationType::Update,
            Self::Delete { .. } => OperationType::Delete,
        }
    }
}

/// Compiles operation descriptors against a schema registry.
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    fn dialect(&self) -> DatabaseType {
        self.registry.dialect()
    }

    /// Validate a descriptor and compile it into a parameterized statement.
    pub fn build(&self, descriptor: &OperationDescriptor) -> Result<CompiledOperation, ValidationError> {
        let request = Request::from_descriptor(descriptor)?;
        let operation = request.operation();
        let table = self.registry.resolve_table(&descriptor.table_name)?;
        let dialect = self.dialect();
        let table_sql = dialect.quote_identifier(&table.name);

        let statement = match request {
            Request::Find { filter } => {
                let (column, param) = self.filter(table, filter)?;
                SqlStatement::new(format!(
                    "SELECT * FROM {} WHERE {} = :{}",
                    table_sql, column, FILTER_PARAM
                ))
                .with_parameter(param)
            }
            Request::Create { data } => {
                let assignments = self.assignments(table, data, &[])?;
                let columns = assignments
                    .iter()
                    .map(|(column, _)| column.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let values = assignments
                    .iter()
                    .map(|(_, p)| format!(":{}", p.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!("INSERT INTO {} ({}) VALUES ({})", table_sql, columns, values);
                self.finish(sql, assignments.into_iter().map(|(_, p)| p))
            }
            Request::Update { filter, data } => {
                let (filter_column, filter_param) = self.filter(table, filter)?;
                let assignments = self.assignments(table, data, &[FILTER_PARAM])?;
                let set = assignments
                    .iter()
                    .map(|(column, p)| format!("{} = :{}", column, p.name))
                    .collect::<Vec<_>>()
                    .join(", ");
                let sql = format!(
                    "UPDATE {} SET {} WHERE {} = :{}",
                    table_sql, set, filter_column, FILTER_PARAM
                );
                let params = assignments
                    .into_iter()
                    .map(|(_, p)| p)
                    .chain(std::iter::once(filter_param));
                self.finish(sql, params)
            }
            Request::Delete { filter } => {
                let (column, param) = self.filter(table, filter)?;
                let sql = format!(
                    "DELETE FROM {} WHERE {} = :{}",
                    table_sql, column, FILTER_PARAM
                );
                self.finish(sql, std::iter::once(param))
            }
        };

        Ok(CompiledOperation {
            operation,
            table: table.name.clone(),
            statement,
        })
    }

    /// Append `RETURNING *` where the dialect allows it and attach parameters.
    fn finish(&self, sql: String, params: impl IntoIterator<Item = Parameter>) -> SqlStatement {
        let returning = self.dialect().supports_returning();
        let text = if returning {
            format!("{} RETURNING *", sql)
        } else {
            sql
        };
        let statement = params
            .into_iter()
            .fold(SqlStatement::new(text), SqlStatement::with_parameter);
        if returning {
            statement.with_returning()
        } else {
            statement
        }
    }

    /// Quoted filter column and its coerced value.
    fn filter(
        &self,
        table: &TableDef,
        (key, value): (&str, &str),
    ) -> Result<(String, Parameter), ValidationError> {
        let column = table.resolve_column(key)?;
        let value = coerce(column, ScalarValue::from(value))?;
        let param = Parameter::new(FILTER_PARAM, value).with_column_type(&column.data_type);
        Ok((self.dialect().quote_identifier(&column.name), param))
    }

    /// Quoted target columns with their parameters, in data-key order.
    fn assignments(
        &self,
        table: &TableDef,
        data: &BTreeMap<String, ScalarValue>,
        reserved: &[&str],
    ) -> Result<Vec<(String, Parameter)>, ValidationError> {
        let mut used: Vec<String> = reserved.iter().map(|s| s.to_string()).collect();
        let mut assignments = Vec::with_capacity(data.len());

        for (index, (key, value)) in data.iter().enumerate() {
            if key.trim().is_empty() {
                return Err(ValidationError::EmptyColumnName);
            }
            let column = table.resolve_column(key)?;
            let value = coerce(column, value.clone())?;
            let name = parameter_name(&column.name, index, &used);
            used.push(name.clone());
            let param = Parameter::new(name, value).with_column_type(&column.data_type);
            assignments.push((self.dialect().quote_identifier(&column.name), param));
        }
        Ok(assignments)
    }
}

/// The column name when it is a plain identifier, otherwise `param_<i>`,
/// suffixed until it does not collide with names already taken.
fn parameter_name(column: &str, index: usize, used: &[String]) -> String {
    let plain = column
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    let base = if plain {
        column.to_string()
    } else {
        format!("param_{}", index)
    };

    let mut name = base.clone();
    let mut suffix = 1;
    while used.iter().any(|u| u == &name) {
        name = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    name
}

/// Convert text aimed at a numeric or boolean column into the typed value.
fn coerce(column: &ColumnDef, value: ScalarValue) -> Result<ScalarValue, ValidationError> {
    let ScalarValue::String(text) = &value else {
        return Ok(value);
    };
    let invalid = || ValidationError::invalid_value(&column.name, text, column.category.expected());
    let trimmed = text.trim();

    match column.category {
        TypeCategory::Integer => trimmed
            .parse::<i64>()
            .map(ScalarValue::Int)
            .map_err(|_| invalid()),
        TypeCategory::Float => trimmed
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(ScalarValue::Float)
            .ok_or_else(invalid),
        TypeCategory::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(ScalarValue::Bool(true)),
            "false" | "f" | "0" => Ok(ScalarValue::Bool(false)),
            _ => Err(invalid()),
        },
        _ => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(dialect: DatabaseType) -> SchemaRegistry {
        let columns = [
            ("id", "integer"),
            ("guest_id", "integer"),
            ("room_id", "integer"),
            ("date", "date"),
            ("total_price", "numeric"),
            ("paid", "boolean"),
            ("note", "text"),
            ("filter_value", "text"),
            ("check-in", "text"),
        ];
        SchemaRegistry::from_tables(
            dialect,
            vec![TableDef::new(
                "Reservations",
                columns
                    .iter()
                    .map(|(name, ty)| ColumnDef::new(*name, *ty, dialect))
                    .collect(),
            )],
        )
    }

    fn build(
        dialect: DatabaseType,
        descriptor: &OperationDescriptor,
    ) -> Result<CompiledOperation, ValidationError> {
        QueryBuilder::new(&registry(dialect)).build(descriptor)
    }

    #[test]
    fn test_geometric_filter_value_is_not_coerced() {
        let dialect = DatabaseType::PostgreSQL;
        let registry = SchemaRegistry::from_tables(
            dialect,
            vec![TableDef::new(
                "Landmarks",
                vec![
                    ColumnDef::new("id", "int4", dialect),
                    ColumnDef::new("location", "point", dialect),
                ],
            )],
        );
        let descriptor =
            OperationDescriptor::new("Landmarks", "find").with_filter("location", "(1,2)");
        let compiled = QueryBuilder::new(&registry).build(&descriptor).unwrap();
        assert_eq!(
            compiled.statement.parameter("filter_value").unwrap().value,
            ScalarValue::from("(1,2)")
        );
        let bound = compiled.statement.bind(dialect).unwrap();
        assert_eq!(
            bound.sql,
            "SELECT * FROM \"Landmarks\" WHERE \"location\" = CAST($1 AS \"point\")"
        );
    }

    #[test]
    fn test_find_sql() {
        let descriptor = OperationDescriptor::new("reservations", "FIND").with_filter("ID", "42");
        let compiled = build(DatabaseType::SQLite, &descriptor).unwrap();

        assert_eq!(compiled.operation, OperationType::Find);
        assert_eq!(compiled.table, "Reservations");
        assert_eq!(
            compiled.statement.text(),
            "SELECT * FROM \"Reservations\" WHERE \"id\" = :filter_value"
        );
        assert_eq!(
            compiled.statement.parameter("filter_value").unwrap().value,
            ScalarValue::Int(42)
        );
        assert!(!compiled.statement.is_returning());
    }

    #[test]
    fn test_create_sql_per_dialect() {
        let descriptor = OperationDescriptor::new("Reservations", "create")
            .with_data("guest_id", 1)
            .with_data("room_id", 5)
            .with_data("date", "2025-03-15");

        let sqlite = build(DatabaseType::SQLite, &descriptor).unwrap();
        assert_eq!(
            sqlite.statement.text(),
            "INSERT INTO \"Reservations\" (\"date\", \"guest_id\", \"room_id\") VALUES (:date, :guest_id, :room_id) RETURNING *"
        );
        assert!(sqlite.statement.is_returning());

        let mysql = build(DatabaseType::MySQL, &descriptor).unwrap();
        assert_eq!(
            mysql.statement.text(),
            "INSERT INTO `Reservations` (`date`, `guest_id`, `room_id`) VALUES (:date, :guest_id, :room_id)"
        );
        assert!(!mysql.statement.is_returning());
    }

    #[test]
    fn test_update_sql_and_bind_order() {
        let descriptor = OperationDescriptor::new("Reservations", "update")
            .with_filter("id", "3")
            .with_data("total_price", 120.5)
            .with_data("paid", "true");
        let compiled = build(DatabaseType::PostgreSQL, &descriptor).unwrap();
        assert_eq!(
            compiled.statement.text(),
            "UPDATE \"Reservations\" SET \"paid\" = :paid, \"total_price\" = :total_price WHERE \"id\" = :filter_value RETURNING *"
        );

        let bound = compiled.statement.bind(DatabaseType::PostgreSQL).unwrap();
        assert_eq!(
            bound.sql,
            "UPDATE \"Reservations\" SET \"paid\" = $1, \"total_price\" = $2 WHERE \"id\" = $3 RETURNING *"
        );
        assert_eq!(
            bound.params,
            vec![
                ScalarValue::Bool(true),
                ScalarValue::Float(120.5),
                ScalarValue::Int(3)
            ]
        );
        assert!(bound.returns_rows());
    }

    #[test]
    fn test_delete_sql() {
        let descriptor = OperationDescriptor::new("Reservations", "Delete").with_filter("id", "9");
        let compiled = build(DatabaseType::SQLite, &descriptor).unwrap();
        assert_eq!(
            compiled.statement.text(),
            "DELETE FROM \"Reservations\" WHERE \"id\" = :filter_value RETURNING *"
        );
    }

    #[test]
    fn test_missing_fields() {
        let cases = [
            (
                OperationDescriptor::new("Reservations", "find"),
                ValidationError::FindFieldsRequired,
            ),
            (
                OperationDescriptor::new("Reservations", "find").with_filter("id", ""),
                ValidationError::FindFieldsRequired,
            ),
            (
                OperationDescriptor::new("Reservations", "create"),
                ValidationError::CreateDataRequired,
            ),
            (
                OperationDescriptor::new("Reservations", "update").with_filter("id", "1"),
                ValidationError::UpdateFieldsRequired,
            ),
            (
                OperationDescriptor::new("Reservations", "update").with_data("paid", true),
                ValidationError::UpdateFieldsRequired,
            ),
            (
                OperationDescriptor::new("Reservations", "delete"),
                ValidationError::DeleteFieldsRequired,
            ),
        ];
        for (descriptor, expected) in cases {
            assert_eq!(build(DatabaseType::SQLite, &descriptor), Err(expected));
        }
    }

    #[test]
    fn test_invalid_operation_wins_over_everything() {
        let descriptor = OperationDescriptor::new("NoSuchTable", "upsert")
            .with_filter("id", "1")
            .with_data("x", 1);
        assert_eq!(
            build(DatabaseType::SQLite, &descriptor),
            Err(ValidationError::InvalidOperationType)
        );
    }

    #[test]
    fn test_presence_checked_before_table() {
        let descriptor = OperationDescriptor::new("NoSuchTable", "delete");
        assert_eq!(
            build(DatabaseType::SQLite, &descriptor),
            Err(ValidationError::DeleteFieldsRequired)
        );
    }

    #[test]
    fn test_unknown_identifiers() {
        let descriptor = OperationDescriptor::new("Guests", "find").with_filter("id", "1");
        assert_eq!(
            build(DatabaseType::SQLite, &descriptor),
            Err(ValidationError::unknown_table("Guests"))
        );

        let descriptor =
            OperationDescriptor::new("Reservations", "find").with_filter("id = 1 OR 1", "1");
        assert_eq!(
            build(DatabaseType::SQLite, &descriptor),
            Err(ValidationError::unknown_column("Reservations", "id = 1 OR 1"))
        );

        let descriptor = OperationDescriptor::new("Reservations", "create").with_data("nope", 1);
        assert_eq!(
            build(DatabaseType::SQLite, &descriptor),
            Err(ValidationError::unknown_column("Reservations", "nope"))
        );
    }

    #[test]
    fn test_empty_data_key() {
        let descriptor = OperationDescriptor::new("Reservations", "create").with_data("", 1);
        assert_eq!(
            build(DatabaseType::SQLite, &descriptor),
            Err(ValidationError::EmptyColumnName)
        );
    }

    #[test]
    fn test_value_coercion() {
        let descriptor = OperationDescriptor::new("Reservations", "find").with_filter("id", "abc");
        let err = build(DatabaseType::SQLite, &descriptor).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Value 'abc' is not valid for column 'id' (expected an integer)."
        );

        let descriptor =
            OperationDescriptor::new("Reservations", "find").with_filter("paid", "F");
        let compiled = build(DatabaseType::PostgreSQL, &descriptor).unwrap();
        assert_eq!(
            compiled.statement.parameter("filter_value").unwrap().value,
            ScalarValue::Bool(false)
        );

        let descriptor =
            OperationDescriptor::new("Reservations", "find").with_filter("date", "2025-03-15");
        let compiled = build(DatabaseType::PostgreSQL, &descriptor).unwrap();
        assert_eq!(
            compiled.statement.parameter("filter_value").unwrap().value,
            ScalarValue::from("2025-03-15")
        );
        let bound = compiled.statement.bind(DatabaseType::PostgreSQL).unwrap();
        assert_eq!(
            bound.sql,
            "SELECT * FROM \"Reservations\" WHERE \"date\" = CAST($1 AS \"date\")"
        );
    }

    #[test]
    fn test_parameter_names_do_not_collide() {
        let descriptor = OperationDescriptor::new("Reservations", "update")
            .with_filter("id", "1")
            .with_data("filter_value", "x")
            .with_data("check-in", "y");
        let compiled = build(DatabaseType::SQLite, &descriptor).unwrap();
        assert_eq!(
            compiled.statement.text(),
            "UPDATE \"Reservations\" SET \"check-in\" = :param_0, \"filter_value\" = :filter_value_1 WHERE \"id\" = :filter_value RETURNING *"
        );

        let bound = compiled.statement.bind(DatabaseType::SQLite).unwrap();
        assert_eq!(
            bound.params,
            vec![
                ScalarValue::from("y"),
                ScalarValue::from("x"),
                ScalarValue::Int(1)
            ]
        );
    }

    #[test]
    fn test_parameter_name() {
        assert_eq!(parameter_name("guest_id", 0, &[]), "guest_id");
        assert_eq!(parameter_name("1st", 2, &[]), "param_2");
        assert_eq!(
            parameter_name("a", 0, &["a".to_string(), "a_1".to_string()]),
            "a_2"
        );
    }
}
