//! Structured CRUD tool.
//!
//! This module implements the `database_query` MCP tool: an operation
//! descriptor is validated and compiled by the query builder, bound for the
//! pool's dialect, and executed in its own transaction. A table or column the
//! registry does not know triggers one schema reload before the request is
//! rejected, so tables created after startup become usable.

use crate::db::{DbPool, SchemaCatalog, SchemaRegistry, StatementExecutor};
use crate::error::ToolError;
use crate::models::{ExecutionOutcome, OperationDescriptor, OperationType};
use crate::sql::{CompiledOperation, QueryBuilder};
use crate::tools::format::{EmptyResultStyle, RECORD_CREATED_PREFIX, format_outcome};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a successful CRUD operation, before formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryReport {
    pub operation: OperationType,
    pub outcome: ExecutionOutcome,
}

impl QueryReport {
    /// Text returned to the agent.
    pub fn to_text(&self) -> String {
        let text = format_outcome(&self.outcome, EmptyResultStyle::Records);
        match self.operation {
            OperationType::Create => format!("{}{}", RECORD_CREATED_PREFIX, text),
            _ => text,
        }
    }
}

/// Handler for the `database_query` tool.
pub struct DatabaseQueryToolHandler {
    pool: Arc<DbPool>,
    schema: Arc<SchemaCatalog>,
    executor: StatementExecutor,
}

impl DatabaseQueryToolHandler {
    pub fn new(pool: Arc<DbPool>, schema: Arc<SchemaCatalog>) -> Self {
        Self {
            pool,
            schema,
            executor: StatementExecutor::new(),
        }
    }

    /// Validate, compile and execute one operation.
    pub async fn run(&self, descriptor: &OperationDescriptor) -> Result<QueryReport, ToolError> {
        let compiled = self.compile(descriptor).await?;
        let bound = compiled
            .statement
            .bind(self.pool.db_type())
            .map_err(ToolError::Operation)?;

        let outcome = self
            .executor
            .execute(&self.pool, &bound)
            .await
            .map_err(ToolError::Execution)?;

        info!(
            operation = %compiled.operation,
            table = %compiled.table,
            rows = outcome.row_count(),
            "Operation executed"
        );

        Ok(QueryReport {
            operation: compiled.operation,
            outcome,
        })
    }

    async fn compile(&self, descriptor: &OperationDescriptor) -> Result<CompiledOperation, ToolError> {
        let registry = self.schema.current().await;
        match QueryBuilder::new(&registry).build(descriptor) {
            Err(e) if e.is_unknown_identifier() => {
                debug!(table = %descriptor.table_name, "Unknown identifier, reloading schema");
                let registry = self.reload_schema(registry).await;
                Ok(QueryBuilder::new(&registry).build(descriptor)?)
            }
            result => Ok(result?),
        }
    }

    async fn reload_schema(&self, previous: Arc<SchemaRegistry>) -> Arc<SchemaRegistry> {
        match self.schema.reload(&self.pool).await {
            Ok(registry) => registry,
            Err(e) => {
                warn!(error = %e, "Schema reload failed, keeping previous schema");
                previous
            }
        }
    }

    /// Run an operation and render the result or error as text.
    pub async fn execute(&self, descriptor: &OperationDescriptor) -> String {
        match self.run(descriptor).await {
            Ok(report) => report.to_text(),
            Err(e) => {
                if e.is_validation() {
                    info!(table = %descriptor.table_name, "Operation rejected: {}", e);
                } else {
                    warn!(
                        table = %descriptor.table_name,
                        sql_state = ?e.sql_state(),
                        suggestion = ?e.suggestion(),
                        "Operation failed: {}",
                        e
                    );
                }
                e.to_string()
            }
        }
    }
}
