//! Raw SQL passthrough tool.
//!
//! This module implements the `sql_query_executor` MCP tool. The SQL text is
//! executed exactly as given, inside its own transaction, with no validation
//! beyond rejecting blank input. A statement that completes without rows may
//! have changed the schema, so the registry is reloaded after it.

use crate::db::{DbPool, SchemaCatalog, StatementExecutor};
use crate::error::{DbError, ToolError};
use crate::models::ExecutionOutcome;
use crate::sql::BoundStatement;
use crate::tools::format::{EmptyResultStyle, format_outcome};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Input for the `sql_query_executor` tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SqlQueryInput {
    /// SQL statement to execute as-is. Rows are returned for statements starting with SELECT.
    pub sql_query: String,
}

/// Handler for the `sql_query_executor` tool.
pub struct RawSqlToolHandler {
    pool: Arc<DbPool>,
    schema: Arc<SchemaCatalog>,
    executor: StatementExecutor,
}

impl RawSqlToolHandler {
    pub fn new(pool: Arc<DbPool>, schema: Arc<SchemaCatalog>) -> Self {
        Self {
            pool,
            schema,
            executor: StatementExecutor::new(),
        }
    }

    /// Execute the SQL. Every failure on this path is an operation error.
    pub async fn run(&self, sql: &str) -> Result<ExecutionOutcome, ToolError> {
        if sql.trim().is_empty() {
            return Err(ToolError::Operation(DbError::invalid_input(
                "SQL query is empty",
            )));
        }

        let statement = BoundStatement::raw(sql);
        let outcome = self
            .executor
            .execute(&self.pool, &statement)
            .await
            .map_err(ToolError::Operation)?;
        info!(rows = outcome.row_count(), "Raw SQL executed");

        if outcome == ExecutionOutcome::Success {
            if let Err(e) = self.schema.reload(&self.pool).await {
                warn!(error = %e, "Schema reload failed, keeping previous schema");
            }
        }
        Ok(outcome)
    }

    /// Run the SQL and render the result or error as text.
    pub async fn execute(&self, input: &SqlQueryInput) -> String {
        match self.run(&input.sql_query).await {
            Ok(outcome) => format_outcome(&outcome, EmptyResultStyle::Results),
            Err(e) => {
                warn!(
                    sql_state = ?e.sql_state(),
                    suggestion = ?e.suggestion(),
                    "Raw SQL failed: {}",
                    e
                );
                e.to_string()
            }
        }
    }
}
