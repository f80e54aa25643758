//! Schema introspection and the table/column allow-list.
//!
//! The registry is loaded at startup and reloaded through [`SchemaCatalog`]
//! when the database schema changes. Every table and column name that reaches
//! generated SQL is taken from here, never from the caller.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, mysql, sqlite), each returning `(table, column, type)`
//! rows in table then column order.

use crate::db::pool::DbPool;
use crate::db::types::{TypeCategory, categorize_type, normalize_type_name};
use crate::error::{DbError, DbResult, ValidationError};
use crate::models::DatabaseType;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// A column the CRUD tool may reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    /// Type name as reported by the catalog (`udt_name` on PostgreSQL).
    pub data_type: String,
    pub category: TypeCategory,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, dialect: DatabaseType) -> Self {
        let data_type = data_type.into();
        let category = categorize_type(&data_type, dialect);
        Self {
            name: name.into(),
            data_type,
            category,
        }
    }
}

/// A table the CRUD tool may reference.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Resolve a caller-supplied column name to its canonical definition.
    pub fn resolve_column(&self, name: &str) -> Result<&ColumnDef, ValidationError> {
        lookup(&self.columns, name, |c| c.name.as_str())
            .ok_or_else(|| ValidationError::unknown_column(&self.name, name))
    }
}

/// Exact match first, then a unique case-insensitive match.
fn lookup<'a, T>(items: &'a [T], name: &str, key: impl Fn(&T) -> &str) -> Option<&'a T> {
    if let Some(item) = items.iter().find(|item| key(item) == name) {
        return Some(item);
    }
    let mut matches = items
        .iter()
        .filter(|item| key(item).eq_ignore_ascii_case(name));
    match (matches.next(), matches.next()) {
        (Some(item), None) => Some(item),
        _ => None,
    }
}

/// Tables and columns known to exist, with their types.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    dialect: DatabaseType,
    tables: Vec<TableDef>,
}

impl SchemaRegistry {
    /// Build a registry from already-known table definitions.
    pub fn from_tables(dialect: DatabaseType, tables: Vec<TableDef>) -> Self {
        Self { dialect, tables }
    }

    /// Introspect the connected database.
    ///
    /// When `allowed` is non-empty only those tables are kept; naming a table
    /// that does not exist is an error.
    pub async fn load(pool: &DbPool, allowed: &[String]) -> DbResult<Self> {
        let rows = match pool {
            DbPool::Postgres(p) => postgres::list_columns(p).await?,
            DbPool::MySql(p) => mysql::list_columns(p).await?,
            DbPool::SQLite(p) => sqlite::list_columns(p).await?,
        };

        let dialect = pool.db_type();
        let mut tables: Vec<TableDef> = Vec::new();
        for (table, column, data_type) in rows {
            let column = ColumnDef::new(column, data_type, dialect);
            match tables.last_mut() {
                Some(last) if last.name == table => last.columns.push(column),
                _ => tables.push(TableDef::new(table, vec![column])),
            }
        }
        debug!(count = tables.len(), "Introspected tables");

        let registry = Self::from_tables(dialect, tables);
        let registry = if allowed.is_empty() {
            registry
        } else {
            registry.restrict_to(allowed)?
        };

        info!(
            tables = ?registry.table_names().collect::<Vec<_>>(),
            "Schema registry loaded"
        );
        Ok(registry)
    }

    /// Keep only the named tables, in the order given.
    pub fn restrict_to(self, allowed: &[String]) -> DbResult<Self> {
        let mut kept: Vec<TableDef> = Vec::with_capacity(allowed.len());
        for name in allowed {
            let table = self.resolve_table(name).map_err(|_| {
                DbError::schema(format!("Table '{}' not found in the database", name), name)
            })?;
            if !kept.iter().any(|t| t.name == table.name) {
                kept.push(table.clone());
            }
        }
        Ok(Self::from_tables(self.dialect, kept))
    }

    pub fn dialect(&self) -> DatabaseType {
        self.dialect
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Resolve a caller-supplied table name to its canonical definition.
    pub fn resolve_table(&self, name: &str) -> Result<&TableDef, ValidationError> {
        lookup(&self.tables, name, |t| t.name.as_str())
            .ok_or_else(|| ValidationError::unknown_table(name))
    }

    /// One line per table, e.g. `Rooms(id integer, room_number text)`.
    pub fn describe(&self) -> String {
        if self.tables.is_empty() {
            return "No tables available.".to_string();
        }
        self.tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|c| format!("{} {}", c.name, normalize_type_name(&c.data_type)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({})", table.name, columns)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The registry currently in use, shared by the tool handlers.
///
/// Readers take a snapshot; a reload swaps in a fresh registry built with the
/// same allow-list.
#[derive(Debug)]
pub struct SchemaCatalog {
    allowed: Vec<String>,
    current: RwLock<Arc<SchemaRegistry>>,
}

impl SchemaCatalog {
    pub fn new(registry: SchemaRegistry, allowed: Vec<String>) -> Self {
        Self {
            allowed,
            current: RwLock::new(Arc::new(registry)),
        }
    }

    /// Introspect the database and wrap the result.
    pub async fn load(pool: &DbPool, allowed: Vec<String>) -> DbResult<Self> {
        let registry = SchemaRegistry::load(pool, &allowed).await?;
        Ok(Self::new(registry, allowed))
    }

    pub async fn current(&self) -> Arc<SchemaRegistry> {
        self.current.read().await.clone()
    }

    /// Introspect again and replace the current registry.
    ///
    /// On failure the previous registry stays in place.
    pub async fn reload(&self, pool: &DbPool) -> DbResult<Arc<SchemaRegistry>> {
        let registry = Arc::new(SchemaRegistry::load(pool, &self.allowed).await?);
        *self.current.write().await = registry.clone();
        Ok(registry)
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod postgres {
        pub const LIST_COLUMNS: &str = r#"
            SELECT
                c.table_name::text AS table_name,
                c.column_name::text AS column_name,
                c.udt_name::text AS data_type
            FROM information_schema.columns c
            JOIN information_schema.tables t
                ON t.table_schema = c.table_schema AND t.table_name = c.table_name
            WHERE c.table_schema = current_schema()
            AND t.table_type = 'BASE TABLE'
            ORDER BY c.table_name, c.ordinal_position
            "#;
    }

    pub mod mysql {
        pub const LIST_COLUMNS: &str = r#"
            SELECT
                CONVERT(c.TABLE_NAME USING utf8) AS TABLE_NAME,
                CONVERT(c.COLUMN_NAME USING utf8) AS COLUMN_NAME,
                CONVERT(c.COLUMN_TYPE USING utf8) AS DATA_TYPE
            FROM information_schema.COLUMNS c
            JOIN information_schema.TABLES t
                ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME
            WHERE c.TABLE_SCHEMA = DATABASE()
            AND t.TABLE_TYPE = 'BASE TABLE'
            ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION
            "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            ORDER BY name
            "#;

        pub const TABLE_COLUMNS: &str = "SELECT name, type FROM pragma_table_info(?) ORDER BY cid";
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

type ColumnRow = (String, String, String);

mod postgres {
    use super::*;
    use sqlx::{PgPool, Row};

    pub async fn list_columns(pool: &PgPool) -> DbResult<Vec<ColumnRow>> {
        let rows = sqlx::query(queries::postgres::LIST_COLUMNS)
            .fetch_all(pool)
            .await?;

        rows.iter()
            .map(|row| -> DbResult<ColumnRow> {
                Ok((
                    row.try_get("table_name")?,
                    row.try_get("column_name")?,
                    row.try_get("data_type")?,
                ))
            })
            .collect()
    }
}

mod mysql {
    use super::*;
    use sqlx::{MySqlPool, Row};

    pub async fn list_columns(pool: &MySqlPool) -> DbResult<Vec<ColumnRow>> {
        let rows = sqlx::query(queries::mysql::LIST_COLUMNS)
            .fetch_all(pool)
            .await?;

        rows.iter()
            .map(|row| -> DbResult<ColumnRow> {
                Ok((
                    row.try_get("TABLE_NAME")?,
                    row.try_get("COLUMN_NAME")?,
                    row.try_get("DATA_TYPE")?,
                ))
            })
            .collect()
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqlitePool};

    pub async fn list_columns(pool: &SqlitePool) -> DbResult<Vec<ColumnRow>> {
        let tables: Vec<String> = sqlx::query_scalar(queries::sqlite::LIST_TABLES)
            .fetch_all(pool)
            .await?;

        let mut columns = Vec::new();
        for table in tables {
            let rows = sqlx::query(queries::sqlite::TABLE_COLUMNS)
                .bind(&table)
                .fetch_all(pool)
                .await?;
            for row in &rows {
                let name: String = row.try_get("name")?;
                let data_type: String = row.try_get("type")?;
                columns.push((table.clone(), name, data_type));
            }
        }
        Ok(columns)
    }
}
