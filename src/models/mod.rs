//! Data models for the CRUD MCP Server.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod operation;
pub mod outcome;

// Re-export commonly used types
pub use connection::DatabaseType;
pub use operation::{OperationDescriptor, OperationType, ScalarValue};
pub use outcome::{ExecutionOutcome, Record};
