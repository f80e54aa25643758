//! Statement execution engine.
//!
//! Every statement runs alone inside its own transaction: begin, run once,
//! commit. Any failure rolls the transaction back before the error is
//! returned, so a failed statement never leaves partial changes behind.
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules
//! (`mysql`, `postgres`, `sqlite`), each providing the same interface adapted
//! to the database's type system.

use crate::db::params::{bind_mysql_param, bind_postgres_param, bind_sqlite_param};
use crate::db::pool::DbPool;
use crate::db::types::RowToRecord;
use crate::error::DbResult;
use crate::models::{ExecutionOutcome, Record};
use crate::sql::BoundStatement;
use sqlx::Transaction;
use std::time::Instant;
use tracing::{debug, warn};

/// Runs bound statements against a pool, one transaction per statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementExecutor;

impl StatementExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Execute a statement and return its rows, or `Success` if it produces none.
    pub async fn execute(
        &self,
        pool: &DbPool,
        statement: &BoundStatement,
    ) -> DbResult<ExecutionOutcome> {
        let start = Instant::now();
        debug!(
            sql = %statement.sql,
            params = statement.params.len(),
            returns_rows = statement.returns_rows(),
            "Executing statement"
        );

        let outcome = match pool {
            DbPool::MySql(p) => mysql::run(p, statement).await,
            DbPool::Postgres(p) => postgres::run(p, statement).await,
            DbPool::SQLite(p) => sqlite::run(p, statement).await,
        }?;

        debug!(
            rows = outcome.row_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Statement committed"
        );
        Ok(outcome)
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn rows_outcome<R: RowToRecord>(rows: &[R]) -> ExecutionOutcome {
    ExecutionOutcome::Rows(rows.iter().map(RowToRecord::to_record).collect::<Vec<Record>>())
}

/// Commit on success; roll back and hand back the driver error otherwise.
async fn finish<DB: sqlx::Database>(
    tx: Transaction<'_, DB>,
    result: Result<ExecutionOutcome, sqlx::Error>,
) -> DbResult<ExecutionOutcome> {
    match result {
        Ok(outcome) => {
            tx.commit().await?;
            Ok(outcome)
        }
        Err(e) => {
            debug!(error = %e, "Statement failed, rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e.into())
        }
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Without parameters the SQL is sent unprepared, which also lets the raw path
// run statements that cannot be prepared.

mod mysql {
    use super::*;
    use sqlx::{MySql, MySqlPool};

    pub async fn run(pool: &MySqlPool, stmt: &BoundStatement) -> DbResult<ExecutionOutcome> {
        let mut tx = pool.begin().await?;
        let result = run_in(&mut tx, stmt).await;
        finish(tx, result).await
    }

    async fn run_in(
        tx: &mut Transaction<'_, MySql>,
        stmt: &BoundStatement,
    ) -> Result<ExecutionOutcome, sqlx::Error> {
        if stmt.params.is_empty() {
            use sqlx::Executor;
            if stmt.returns_rows() {
                let rows = (&mut **tx).fetch_all(stmt.sql.as_str()).await?;
                return Ok(rows_outcome(&rows));
            }
            (&mut **tx).execute(stmt.sql.as_str()).await?;
            return Ok(ExecutionOutcome::Success);
        }

        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_mysql_param(query, param);
        }
        if stmt.returns_rows() {
            let rows = query.fetch_all(&mut **tx).await?;
            Ok(rows_outcome(&rows))
        } else {
            query.execute(&mut **tx).await?;
            Ok(ExecutionOutcome::Success)
        }
    }
}

mod postgres {
    use super::*;
    use sqlx::{PgPool, Postgres};

    pub async fn run(pool: &PgPool, stmt: &BoundStatement) -> DbResult<ExecutionOutcome> {
        let mut tx = pool.begin().await?;
        let result = run_in(&mut tx, stmt).await;
        finish(tx, result).await
    }

    async fn run_in(
        tx: &mut Transaction<'_, Postgres>,
        stmt: &BoundStatement,
    ) -> Result<ExecutionOutcome, sqlx::Error> {
        if stmt.params.is_empty() {
            use sqlx::Executor;
            if stmt.returns_rows() {
                let rows = (&mut **tx).fetch_all(stmt.sql.as_str()).await?;
                return Ok(rows_outcome(&rows));
            }
            (&mut **tx).execute(stmt.sql.as_str()).await?;
            return Ok(ExecutionOutcome::Success);
        }

        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_postgres_param(query, param);
        }
        if stmt.returns_rows() {
            let rows = query.fetch_all(&mut **tx).await?;
            Ok(rows_outcome(&rows))
        } else {
            query.execute(&mut **tx).await?;
            Ok(ExecutionOutcome::Success)
        }
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Sqlite, SqlitePool};

    pub async fn run(pool: &SqlitePool, stmt: &BoundStatement) -> DbResult<ExecutionOutcome> {
        let mut tx = pool.begin().await?;
        let result = run_in(&mut tx, stmt).await;
        finish(tx, result).await
    }

    async fn run_in(
        tx: &mut Transaction<'_, Sqlite>,
        stmt: &BoundStatement,
    ) -> Result<ExecutionOutcome, sqlx::Error> {
        if stmt.params.is_empty() {
            use sqlx::Executor;
            if stmt.returns_rows() {
                let rows = (&mut **tx).fetch_all(stmt.sql.as_str()).await?;
                return Ok(rows_outcome(&rows));
            }
            (&mut **tx).execute(stmt.sql.as_str()).await?;
            return Ok(ExecutionOutcome::Success);
        }

        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_sqlite_param(query, param);
        }
        if stmt.returns_rows() {
            let rows = query.fetch_all(&mut **tx).await?;
            Ok(rows_outcome(&rows))
        } else {
            query.execute(&mut **tx).await?;
            Ok(ExecutionOutcome::Success)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::error::DbError;
    use crate::models::{DatabaseType, ScalarValue};
    use crate::sql::{Parameter, SqlStatement};
    use serde_json::json;

    async fn sqlite_pool(dir: &tempfile::TempDir) -> DbPool {
        let url = format!("sqlite:{}", dir.path().join("exec.db").display());
        let pool = DbPool::connect(&DatabaseConfig::parse(&url).unwrap())
            .await
            .unwrap();
        let executor = StatementExecutor::new();
        executor
            .execute(
                &pool,
                &BoundStatement::raw("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT UNIQUE)"),
            )
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn test_execute_select_rows() {
        let dir = tempfile::tempdir().unwrap();
        let pool = sqlite_pool(&dir).await;
        let executor = StatementExecutor::new();

        let outcome = executor
            .execute(&pool, &BoundStatement::raw("SELECT 1 AS one, 'a' AS letter"))
            .await
            .unwrap();
        let rows = outcome.rows().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("one"), Some(&json!(1)));
        assert_eq!(rows[0].get("letter"), Some(&json!("a")));
    }

    #[tokio::test]
    async fn test_execute_returning_with_params() {
        let dir = tempfile::tempdir().unwrap();
        let pool = sqlite_pool(&dir).await;
        let executor = StatementExecutor::new();

        let statement = SqlStatement::new("INSERT INTO t (name) VALUES (:name) RETURNING *")
            .with_parameter(Parameter::new("name", ScalarValue::from("alpha")))
            .with_returning()
            .bind(DatabaseType::SQLite)
            .unwrap();
        let outcome = executor.execute(&pool, &statement).await.unwrap();
        let rows = outcome.rows().unwrap();
        assert_eq!(rows[0].get("id"), Some(&json!(1)));
        assert_eq!(rows[0].get("name"), Some(&json!("alpha")));
    }

    #[tokio::test]
    async fn test_execute_non_select_is_success_and_committed() {
        let dir = tempfile::tempdir().unwrap();
        let pool = sqlite_pool(&dir).await;
        let executor = StatementExecutor::new();

        let outcome = executor
            .execute(&pool, &BoundStatement::raw("INSERT INTO t (name) VALUES ('x')"))
            .await
            .unwrap();
        assert_eq!(outcome, ExecutionOutcome::Success);

        let outcome = executor
            .execute(&pool, &BoundStatement::raw("SELECT COUNT(*) AS n FROM t"))
            .await
            .unwrap();
        assert_eq!(outcome.rows().unwrap()[0].get("n"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_failed_statement_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let pool = sqlite_pool(&dir).await;
        let executor = StatementExecutor::new();

        executor
            .execute(&pool, &BoundStatement::raw("INSERT INTO t (name) VALUES ('dup')"))
            .await
            .unwrap();

        // The first insert succeeds inside the transaction, the second violates
        // the unique constraint; neither may survive.
        let err = executor
            .execute(
                &pool,
                &BoundStatement::raw(
                    "INSERT INTO t (name) VALUES ('new'); INSERT INTO t (name) VALUES ('dup')",
                ),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Database { .. }));
        assert!(err.detail().contains("UNIQUE"));

        let outcome = executor
            .execute(&pool, &BoundStatement::raw("SELECT name FROM t ORDER BY id"))
            .await
            .unwrap();
        assert_eq!(outcome.row_count(), 1);
    }

    #[tokio::test]
    async fn test_null_and_float_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let pool = sqlite_pool(&dir).await;
        let executor = StatementExecutor::new();

        let outcome = executor
            .execute(&pool, &BoundStatement::raw("SELECT NULL AS a, 2.5 AS b, x'FF00' AS c"))
            .await
            .unwrap();
        let row = &outcome.rows().unwrap()[0];
        assert_eq!(row.get("a"), Some(&json!(null)));
        assert_eq!(row.get("b"), Some(&json!(2.5)));
        assert_eq!(row.get("c"), Some(&json!("/wA=")));
    }
}
