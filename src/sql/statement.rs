//! Compiled statements and parameter assembly.
//!
//! The query builder produces a [`SqlStatement`] whose text refers to values by
//! name (`:filter_value`, `:guest_id`). Before execution it is rendered into the
//! dialect's positional form, giving a [`BoundStatement`].

use crate::db::types::{TypeCategory, categorize_type};
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, ScalarValue};

/// A named value bound to a statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: ScalarValue,
    /// Declared type of the column the value is compared with or stored in.
    pub column_type: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: ScalarValue) -> Self {
        Self {
            name: name.into(),
            value,
            column_type: None,
        }
    }

    pub fn with_column_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    /// PostgreSQL will not implicitly convert a text parameter to a non-text
    /// column type, so such parameters are rendered inside a `CAST`.
    fn needs_cast(&self, dialect: DatabaseType) -> Option<&str> {
        if dialect != DatabaseType::PostgreSQL {
            return None;
        }
        if !matches!(self.value, ScalarValue::String(_) | ScalarValue::Null) {
            return None;
        }
        self.column_type
            .as_deref()
            .filter(|ty| categorize_type(ty, dialect) != TypeCategory::Text)
    }
}

/// SQL text with named placeholders and the values bound to them.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    text: String,
    parameters: Vec<Parameter>,
    returning: bool,
}

impl SqlStatement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
            returning: false,
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Mark the statement as ending in a `RETURNING` clause.
    pub fn with_returning(mut self) -> Self {
        self.returning = true;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn is_returning(&self) -> bool {
        self.returning
    }

    /// Render named placeholders into the dialect's positional form.
    ///
    /// Quoted regions (`'..'`, `".."`, `` `..` ``) are copied untouched and
    /// `::` is kept as a literal cast operator. Every occurrence of a name gets
    /// its own position. A placeholder with no matching parameter is an error.
    pub fn bind(&self, dialect: DatabaseType) -> DbResult<BoundStatement> {
        let mut sql = String::with_capacity(self.text.len() + 16);
        let mut params = Vec::with_capacity(self.parameters.len());
        let mut quote: Option<char> = None;
        let mut chars = self.text.chars().peekable();

        while let Some(c) = chars.next() {
            if let Some(q) = quote {
                sql.push(c);
                if c == q {
                    quote = None;
                }
                continue;
            }

            match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    sql.push(c);
                }
                ':' if chars.peek() == Some(&':') => {
                    sql.push_str("::");
                    chars.next();
                }
                ':' if chars
                    .peek()
                    .is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') =>
                {
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if n.is_ascii_alphanumeric() || n == '_' {
                            name.push(n);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let param = self.parameter(&name).ok_or_else(|| {
                        DbError::invalid_input(format!("Missing value for parameter '{}'", name))
                    })?;
                    params.push(param.value.clone());
                    let placeholder = dialect.placeholder(params.len());
                    match param.needs_cast(dialect) {
                        Some(ty) => sql.push_str(&format!(
                            "CAST({} AS {})",
                            placeholder,
                            dialect.quote_identifier(ty)
                        )),
                        None => sql.push_str(&placeholder),
                    }
                }
                _ => sql.push(c),
            }
        }

        Ok(BoundStatement {
            returns_rows: self.returning || is_select(&self.text),
            sql,
            params,
        })
    }
}

/// Statement ready for the executor: positional SQL plus ordered values.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: Vec<ScalarValue>,
    returns_rows: bool,
}

impl BoundStatement {
    /// Caller-supplied SQL, run exactly as given with no parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        let sql = sql.into();
        Self {
            returns_rows: is_select(&sql),
            sql,
            params: Vec::new(),
        }
    }

    /// Whether the executor should fetch rows rather than just execute.
    pub fn returns_rows(&self) -> bool {
        self.returns_rows
    }
}

/// Whether the statement text begins with `SELECT` (trimmed, any case).
pub fn is_select(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("select"))
}
