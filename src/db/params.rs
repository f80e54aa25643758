//! Parameter binding utilities for database queries.
//!
//! This module provides functions to bind `ScalarValue` parameters to
//! database-specific query objects.

use crate::models::ScalarValue;
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Postgres, Sqlite};

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q ScalarValue,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        ScalarValue::Null => query.bind(None::<String>),
        ScalarValue::Bool(v) => query.bind(*v),
        ScalarValue::Int(v) => query.bind(*v),
        ScalarValue::Float(v) => query.bind(*v),
        ScalarValue::String(v) => query.bind(v.as_str()),
    }
}

/// Bind a parameter to a PostgreSQL query.
///
/// Strings and NULLs aimed at non-text columns are wrapped in a `CAST` by the
/// statement renderer, so binding them as text is always accepted.
pub(crate) fn bind_postgres_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &'q ScalarValue,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param {
        ScalarValue::Null => query.bind(None::<String>),
        ScalarValue::Bool(v) => query.bind(*v),
        ScalarValue::Int(v) => query.bind(*v),
        ScalarValue::Float(v) => query.bind(*v),
        ScalarValue::String(v) => query.bind(v.as_str()),
    }
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q ScalarValue,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        ScalarValue::Null => query.bind(None::<String>),
        ScalarValue::Bool(v) => query.bind(*v),
        ScalarValue::Int(v) => query.bind(*v),
        ScalarValue::Float(v) => query.bind(*v),
        ScalarValue::String(v) => query.bind(v.as_str()),
    }
}
