//! MCP service implementation using rmcp.
//!
//! This module defines the CrudService struct with the database tools
//! exposed via the MCP protocol using the rmcp framework's macros.
//! Every tool answers with plain text, including validation and database
//! errors, so the agent can read and react to them.

use crate::db::{DbPool, SchemaCatalog};
use crate::models::OperationDescriptor;
use crate::tools::{DatabaseQueryToolHandler, RawSqlToolHandler, SqlQueryInput};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct CrudService {
    pool: Arc<DbPool>,
    /// Tables and columns operations may name
    schema: Arc<SchemaCatalog>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl CrudService {
    pub fn new(pool: Arc<DbPool>, schema: Arc<SchemaCatalog>) -> Self {
        Self {
            pool,
            schema,
            tool_router: Self::tool_router(),
        }
    }
}

fn text_result(text: String) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text)])
}

#[tool_router]
impl CrudService {
    #[tool(
        description = "Run a find, create, update or delete operation on one table.\nfind, update and delete match rows where filter_key equals filter_value.\ncreate and update take the column values in data.\nTable and column names must exist in the schema (see describe_schema).\nEach operation runs in its own transaction. Returns matching or affected records, one per line."
    )]
    async fn database_query(
        &self,
        Parameters(descriptor): Parameters<OperationDescriptor>,
    ) -> Result<CallToolResult, McpError> {
        let handler = DatabaseQueryToolHandler::new(self.pool.clone(), self.schema.clone());
        Ok(text_result(handler.execute(&descriptor).await))
    }

    #[tool(
        description = "Execute a raw SQL statement exactly as given, in its own transaction.\nStatements starting with SELECT return their rows, one per line.\nOther statements return a completion message."
    )]
    async fn sql_query_executor(
        &self,
        Parameters(input): Parameters<SqlQueryInput>,
    ) -> Result<CallToolResult, McpError> {
        let handler = RawSqlToolHandler::new(self.pool.clone(), self.schema.clone());
        Ok(text_result(handler.execute(&input).await))
    }

    #[tool(
        description = "List the tables available to database_query with their columns and types, one table per line."
    )]
    async fn describe_schema(&self) -> Result<CallToolResult, McpError> {
        Ok(text_result(self.schema.current().await.describe()))
    }
}

#[tool_handler]
impl ServerHandler for CrudService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "crud-mcp-server".to_owned(),
                title: Some("CRUD MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(format!(
                "Tools for reading and changing records in a {} database.\n\
                \n\
                ## Workflow\n\
                1. Call `describe_schema` to see the tables and columns you may use\n\
                2. Use `database_query` for single-table find/create/update/delete operations\n\
                3. Use `sql_query_executor` only for queries `database_query` cannot express (joins, aggregates)\n\
                \n\
                ## database_query\n\
                - `find`, `update`, `delete` require `filter_key` and `filter_value`\n\
                - `create` and `update` require `data`, a mapping of column names to values\n\
                - Empty results are reported as `No records found.`",
                self.pool.db_type()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::db::StatementExecutor;
    use crate::sql::BoundStatement;

    async fn create_test_service(dir: &tempfile::TempDir) -> CrudService {
        let url = format!("sqlite:{}", dir.path().join("service.db").display());
        let pool = DbPool::connect(&DatabaseConfig::parse(&url).unwrap())
            .await
            .unwrap();
        StatementExecutor::new()
            .execute(
                &pool,
                &BoundStatement::raw("CREATE TABLE Rooms (id INTEGER PRIMARY KEY, name TEXT)"),
            )
            .await
            .unwrap();
        let schema = SchemaCatalog::load(&pool, Vec::new()).await.unwrap();
        CrudService::new(Arc::new(pool), Arc::new(schema))
    }

    fn text_of(result: &CallToolResult) -> String {
        let value = serde_json::to_value(result).unwrap();
        value["content"][0]["text"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_describe_schema_tool() {
        let dir = tempfile::tempdir().unwrap();
        let service = create_test_service(&dir).await;
        let result = service.describe_schema().await.unwrap();
        assert_eq!(text_of(&result), "Rooms(id integer, name text)");
    }

    #[tokio::test]
    async fn test_database_query_tool_returns_text() {
        let dir = tempfile::tempdir().unwrap();
        let service = create_test_service(&dir).await;

        let create = OperationDescriptor::new("rooms", "create").with_data("name", "Suite");
        let result = service.database_query(Parameters(create)).await.unwrap();
        assert_eq!(text_of(&result), "Record created: (1, 'Suite')");

        let invalid = OperationDescriptor::new("Rooms", "upsert");
        let result = service.database_query(Parameters(invalid)).await.unwrap();
        assert_eq!(
            text_of(&result),
            "Error: Invalid operation type. Use 'find', 'create', 'update', or 'delete'."
        );
    }

    #[tokio::test]
    async fn test_sql_query_executor_tool() {
        let dir = tempfile::tempdir().unwrap();
        let service = create_test_service(&dir).await;
        let input = SqlQueryInput {
            sql_query: "SELECT * FROM Rooms".to_string(),
        };
        let result = service.sql_query_executor(Parameters(input)).await.unwrap();
        assert_eq!(text_of(&result), "No results found.");
    }

    #[tokio::test]
    async fn test_describe_schema_after_raw_ddl() {
        let dir = tempfile::tempdir().unwrap();
        let service = create_test_service(&dir).await;
        let input = SqlQueryInput {
            sql_query: "CREATE TABLE Guests (id INTEGER PRIMARY KEY, name TEXT)".to_string(),
        };
        service.sql_query_executor(Parameters(input)).await.unwrap();

        let result = service.describe_schema().await.unwrap();
        assert_eq!(
            text_of(&result),
            "Guests(id integer, name text)\nRooms(id integer, name text)"
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let dir = tempfile::tempdir().unwrap();
        let service = create_test_service(&dir).await;
        let info = service.get_info();
        assert_eq!(info.server_info.name, "crud-mcp-server");
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("describe_schema"));
    }
}
