//! MCP tool implementations.
//!
//! - `database_query`: structured find/create/update/delete operations
//! - `sql_executor`: raw SQL passthrough
//! - `format`: rendering of outcomes as the text returned to the agent

pub mod database_query;
pub mod format;
pub mod sql_executor;

pub use database_query::{DatabaseQueryToolHandler, QueryReport};
pub use format::{EmptyResultStyle, format_outcome, format_record, format_value};
pub use sql_executor::{RawSqlToolHandler, SqlQueryInput};
