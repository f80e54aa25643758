//! Error types for the CRUD MCP Server.
//!
//! Three layers are kept apart so callers can match on structure instead of text:
//! - `ValidationError`: rejected before any database interaction
//! - `DbError`: driver-level failures and internal errors
//! - `ToolError`: tags a failure with the layer it came from and renders the
//!   final text returned to the agent

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Schema error: {message} (object: {object})")]
    Schema { message: String, object: String },

    #[error("Timeout: {operation} did not complete within the configured limit")]
    Timeout { operation: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a schema error.
    pub fn schema(message: impl Into<String>, object: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
            object: object.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            _ => None,
        }
    }

    /// SQLSTATE (or driver error code) reported by the database, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Database { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }

    /// The underlying message without the category prefix.
    ///
    /// Driver messages are handed to the agent verbatim, so the tool layer
    /// uses this instead of `Display`.
    pub fn detail(&self) -> String {
        match self {
            Self::Connection { message, .. }
            | Self::Database { message, .. }
            | Self::Schema { message, .. }
            | Self::InvalidInput { message }
            | Self::Internal { message } => message.clone(),
            Self::Timeout { .. } => self.to_string(),
        }
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::timeout("connection pool acquire"),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Restart the server")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::TypeNotFound { type_name } => DbError::schema(
                format!("Type not found: {}", type_name),
                type_name.to_string(),
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::schema(format!("Column not found: {}", col), col.to_string())
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Rejections raised while checking an operation descriptor.
///
/// The messages are part of the tool contract; agents match on them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Error: 'filter_key' and 'filter_value' are required for 'find' operation.")]
    FindFieldsRequired,

    #[error("Error: 'data' is required for 'create' operation.")]
    CreateDataRequired,

    #[error(
        "Error: 'filter_key', 'filter_value', and 'data' are required for 'update' operation."
    )]
    UpdateFieldsRequired,

    #[error("Error: 'filter_key' and 'filter_value' are required for 'delete' operation.")]
    DeleteFieldsRequired,

    #[error("Error: Invalid operation type. Use 'find', 'create', 'update', or 'delete'.")]
    InvalidOperationType,

    #[error("Error: Unknown table '{table}'.")]
    UnknownTable { table: String },

    #[error("Error: Unknown column '{column}' in table '{table}'.")]
    UnknownColumn { table: String, column: String },

    #[error("Error: Column names in 'data' must not be empty.")]
    EmptyColumnName,

    #[error("Error: Value '{value}' is not valid for column '{column}' ({expected}).")]
    InvalidValue {
        column: String,
        value: String,
        expected: String,
    },
}

impl ValidationError {
    pub fn unknown_table(table: impl Into<String>) -> Self {
        Self::UnknownTable {
            table: table.into(),
        }
    }

    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    /// The caller named a table or column the registry does not know.
    pub fn is_unknown_identifier(&self) -> bool {
        matches!(self, Self::UnknownTable { .. } | Self::UnknownColumn { .. })
    }

    pub fn invalid_value(
        column: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            column: column.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}

/// A failed tool invocation, tagged with the layer that produced it.
///
/// `Display` yields the exact text returned to the agent.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Descriptor rejected before touching the database.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Failure above the executor (parameter assembly), or any failure on the
    /// raw SQL path.
    #[error("Database operation error: {}", .0.detail())]
    Operation(DbError),

    /// Statement failed inside the executor; the transaction was rolled back.
    #[error("Query execution error: {}", .0.detail())]
    Execution(DbError),
}

impl ToolError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    fn db_error(&self) -> Option<&DbError> {
        match self {
            Self::Validation(_) => None,
            Self::Operation(e) | Self::Execution(e) => Some(e),
        }
    }

    pub fn sql_state(&self) -> Option<&str> {
        self.db_error().and_then(DbError::sql_state)
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.db_error().and_then(DbError::suggestion)
    }
}
