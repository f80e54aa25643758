//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool management
//! - Statement execution in per-statement transactions
//! - Schema introspection and the identifier allow-list
//! - Type mappings
//! - Database dispatch macros for reducing code duplication

pub mod executor;
#[macro_use]
pub mod macros;
pub mod params;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::StatementExecutor;
pub use pool::DbPool;
pub use schema::{ColumnDef, SchemaCatalog, SchemaRegistry, TableDef};
