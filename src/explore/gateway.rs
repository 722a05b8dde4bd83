//! Raw SQL Gateway
//!
//! Forwards free-text statements to the engine after a keyword-prefix
//! blocklist check. The check looks only at the first word, so leading
//! comments or a CTE wrapping a mutation get through; the engine-side
//! `readonly` setting is what actually enforces read-only access.

use std::sync::Arc;

use crate::engine::{QueryEngine, Statement};
use crate::explore::decoder::{DecodedResult, RowDecoder};
use crate::explore::error::{ExploreError, ExploreResult};

/// Statement prefixes that are refused
pub const BLOCKED_PREFIXES: [&str; 7] = [
    "drop", "delete", "truncate", "alter", "create", "insert", "update",
];

/// Whether a statement passes the blocklist
pub fn is_read_only(query: &str) -> bool {
    let normalized = query.trim_start().to_lowercase();
    !BLOCKED_PREFIXES
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
}

/// Executes raw SQL against a database
#[derive(Clone)]
pub struct SqlGateway {
    engine: Arc<dyn QueryEngine>,
}

impl SqlGateway {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self { engine }
    }

    pub async fn execute(&self, database: &str, query: &str) -> ExploreResult<DecodedResult> {
        if database.is_empty() {
            return Err(ExploreError::validation("Database is required"));
        }
        if query.trim().is_empty() {
            return Err(ExploreError::validation("Query is required"));
        }
        if !is_read_only(query) {
            return Err(ExploreError::validation("Only SELECT queries are allowed"));
        }

        tracing::info!(database, sql = query, "Executing raw SQL");

        let statement = Statement::new(query).in_database(database);
        let result = RowDecoder::decode(self.engine.query(&statement).await?);

        tracing::debug!(rows = result.rows.len(), "Raw SQL returned");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ColumnMeta, MemoryEngine, ResultSet};
    use serde_json::json;

    #[test]
    fn test_blocklist() {
        for query in [
            "DROP TABLE x",
            "  delete from t",
            "\nTRUNCATE t",
            "Alter table t add column c String",
            "create table t (a Int8)",
            "INSERT INTO t VALUES (1)",
            "update t set a = 1",
        ] {
            assert!(!is_read_only(query), "{}", query);
        }

        assert!(is_read_only("SELECT 1"));
        assert!(is_read_only("show tables"));
        assert!(is_read_only("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(is_read_only("-- comment\nDROP TABLE x"));
    }

    #[tokio::test]
    async fn test_rejections_never_reach_engine() {
        let engine = Arc::new(MemoryEngine::new());
        let gateway = SqlGateway::new(engine.clone());

        let err = gateway.execute("default", "DROP TABLE x").await.unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Only SELECT queries are allowed");

        let err = gateway.execute("", "SELECT 1").await.unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Database is required");

        let err = gateway.execute("default", "   ").await.unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Query is required");

        assert!(engine.executed().is_empty());
    }

    #[tokio::test]
    async fn test_execute_forwards_verbatim() {
        let rs = ResultSet::new(vec![ColumnMeta::new("c", "UInt64")]).row(vec![json!("42")]);
        let engine = Arc::new(MemoryEngine::new().on("count()", rs));
        let gateway = SqlGateway::new(engine.clone());

        let result = gateway
            .execute("otel", "SELECT count() AS c FROM otel_logs")
            .await
            .unwrap();
        assert_eq!(result.columns, vec!["c"]);
        assert_eq!(result.rows.len(), 1);

        let executed = engine.executed();
        assert_eq!(executed[0].sql, "SELECT count() AS c FROM otel_logs");
        assert_eq!(executed[0].database.as_deref(), Some("otel"));
        assert!(executed[0].args.is_empty());
    }

    #[tokio::test]
    async fn test_engine_error_is_execution_error() {
        let gateway = SqlGateway::new(Arc::new(MemoryEngine::new().fail_on("SELEC", "Syntax error")));
        let err = gateway.execute("default", "SELEC 1").await.unwrap_err();
        assert!(!err.is_validation());
    }
}
