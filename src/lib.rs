//! CRUD MCP Server Library
//!
//! Turns structured find/create/update/delete requests from AI agents into
//! parameterized SQL, checked against the introspected schema and executed in
//! one transaction per statement (SQLite, PostgreSQL, MySQL). A raw SQL
//! passthrough tool covers what the structured tool cannot express.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod sql;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::{DbError, ToolError, ValidationError};
pub use mcp::CrudService;
