//! Explore Service
//!
//! Ties the explore pieces together for the HTTP layer:
//!
//! ```text
//! ExploreRequest → validate → allowlist → build → engine → decode → ExploreResponse
//! ```

use std::sync::Arc;

use crate::config::ExploreConfig;
use crate::engine::QueryEngine;
use crate::explore::autocomplete::{AutocompleteSuggestion, Autocompleter};
use crate::explore::builder::QueryBuilder;
use crate::explore::decoder::{DecodedResult, RowDecoder};
use crate::explore::error::{ExploreError, ExploreResult};
use crate::explore::gateway::SqlGateway;
use crate::explore::model::{Aggregate, ExploreRequest, ExploreResponse, FilterOp};
use crate::explore::schema::{SchemaIntrospector, TableField};

/// Schema discovery, query building, raw SQL and autocomplete over one engine
#[derive(Clone)]
pub struct ExploreService {
    engine: Arc<dyn QueryEngine>,
    schema: SchemaIntrospector,
    builder: QueryBuilder,
    gateway: SqlGateway,
    autocompleter: Autocompleter,
    validate_identifiers: bool,
}

impl ExploreService {
    pub fn new(engine: Arc<dyn QueryEngine>, config: &ExploreConfig) -> Self {
        let schema = SchemaIntrospector::new(engine.clone());
        Self {
            builder: QueryBuilder::new(config.default_limit, config.max_limit),
            gateway: SqlGateway::new(engine.clone()),
            autocompleter: Autocompleter::new(schema.clone()),
            schema,
            engine,
            validate_identifiers: config.validate_identifiers,
        }
    }

    pub async fn databases(&self) -> ExploreResult<Vec<String>> {
        self.schema.databases().await
    }

    pub async fn tables(&self, database: &str) -> ExploreResult<Vec<String>> {
        if database.is_empty() {
            return Err(ExploreError::validation("database name is required"));
        }
        self.schema.tables(database).await
    }

    /// Columns offered to the query builder, identifier-like ones excluded
    pub async fn fields(&self, database: &str, table: &str) -> ExploreResult<Vec<TableField>> {
        if database.is_empty() || table.is_empty() {
            return Err(ExploreError::validation(
                "database and table names are required",
            ));
        }
        self.schema.fields(database, table).await
    }

    /// Run a structured explore request
    pub async fn execute(&self, request: &ExploreRequest) -> ExploreResult<ExploreResponse> {
        let spec = self.builder.validate(request)?;
        if self.validate_identifiers {
            self.schema.check_identifiers(&spec).await?;
        }

        let built = self.builder.render(&spec);
        tracing::info!(
            database = %spec.database,
            table = %spec.table,
            aggregate = spec.aggregate.map(|a| a.name()).unwrap_or("none"),
            sql = %built.sql,
            "Executing explore query"
        );

        let result = self.engine.query(&built.into_statement()).await?;
        let response = ExploreResponse::from(RowDecoder::decode(result));

        tracing::info!(rows = response.total, "Explore query completed");
        Ok(response)
    }

    /// Run a read-only raw statement
    pub async fn execute_sql(&self, database: &str, query: &str) -> ExploreResult<DecodedResult> {
        self.gateway.execute(database, query).await
    }

    pub async fn autocomplete(
        &self,
        database: &str,
        query: &str,
        position: i64,
    ) -> ExploreResult<Vec<AutocompleteSuggestion>> {
        if database.is_empty() {
            return Err(ExploreError::validation("Database is required"));
        }
        Ok(self.autocompleter.suggest(database, query, position).await)
    }

    pub fn available_aggregates(&self) -> Vec<&'static str> {
        Aggregate::ALL.iter().map(|a| a.name()).collect()
    }

    pub fn available_filter_operations(&self) -> Vec<&'static str> {
        FilterOp::ALL.iter().map(|op| op.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ColumnMeta, EngineError, MemoryEngine, QueryArg, ResultSet};
    use crate::explore::decoder::DecodedValue;
    use serde_json::json;

    fn log_columns() -> ResultSet {
        ResultSet::new(vec![
            ColumnMeta::new("name", "String"),
            ColumnMeta::new("type", "String"),
        ])
        .row(vec![json!("Body"), json!("String")])
        .row(vec![json!("SeverityText"), json!("LowCardinality(String)")])
        .row(vec![json!("Timestamp"), json!("DateTime64(9)")])
    }

    fn service(engine: MemoryEngine, validate_identifiers: bool) -> (Arc<MemoryEngine>, ExploreService) {
        let engine = Arc::new(engine);
        let config = ExploreConfig {
            validate_identifiers,
            ..Default::default()
        };
        (engine.clone(), ExploreService::new(engine, &config))
    }

    #[tokio::test]
    async fn test_execute_count() {
        let rs = ResultSet::new(vec![ColumnMeta::new("count", "UInt64")]).row(vec![json!("1234")]);
        let (engine, service) = service(MemoryEngine::new().on("COUNT(*)", rs), false);

        let response = service
            .execute(&ExploreRequest::new("default", "otel_logs").aggregate("count"))
            .await
            .unwrap();

        assert_eq!(response.columns, vec!["count"]);
        assert_eq!(response.total, 1);
        assert_eq!(response.data[0]["count"], DecodedValue::UInt(1234));

        let executed = engine.executed();
        assert_eq!(executed.len(), 1);
        assert_eq!(
            executed[0].sql,
            "SELECT COUNT(*) AS count FROM default.otel_logs LIMIT $1"
        );
        assert_eq!(executed[0].args, vec![QueryArg::UInt(1000)]);
    }

    #[tokio::test]
    async fn test_execute_checks_identifiers_first() {
        let rows = ResultSet::new(vec![
            ColumnMeta::new("SeverityText", "LowCardinality(String)"),
            ColumnMeta::new("Timestamp", "DateTime64(9)"),
        ])
        .row(vec![json!("error"), json!("2024-01-15T10:30:00.000000000Z")]);
        let (engine, service) = service(
            MemoryEngine::new()
                .on("system.columns", log_columns())
                .on("FROM default.otel_logs", rows),
            true,
        );

        let response = service
            .execute(
                &ExploreRequest::new("default", "otel_logs")
                    .fields(&["SeverityText", "Timestamp"])
                    .filter("SeverityText", "eq", "error"),
            )
            .await
            .unwrap();
        assert_eq!(
            response.data[0]["Timestamp"],
            DecodedValue::Timestamp("2024-01-15T10:30:00Z".to_string())
        );
        assert_eq!(engine.executed().len(), 2);

        let err = service
            .execute(&ExploreRequest::new("default", "otel_logs").fields(&["Nope"]))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(engine.count_matching("FROM default.otel_logs"), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_engine() {
        let (engine, service) = service(MemoryEngine::new(), true);

        let err = service
            .execute(&ExploreRequest::new("default", "otel_logs").aggregate("sum"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: fields are required for aggregate function: sum"
        );
        assert!(engine.executed().is_empty());
    }

    #[tokio::test]
    async fn test_execution_failure() {
        let (_, service) = service(MemoryEngine::new().fail_on("SELECT", "boom"), false);
        let err = service
            .execute(&ExploreRequest::new("default", "otel_logs"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExploreError::Execution(EngineError::Server { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_name_checks() {
        let (_, service) = service(MemoryEngine::new(), true);
        assert!(service.tables("").await.unwrap_err().is_validation());
        assert!(service.fields("default", "").await.unwrap_err().is_validation());
        assert!(service.autocomplete("", "SEL", 3).await.unwrap_err().is_validation());
    }

    #[test]
    fn test_options() {
        let (_, service) = service(MemoryEngine::new(), true);
        assert_eq!(
            service.available_aggregates(),
            vec!["count", "sum", "avg", "min", "max"]
        );
        assert_eq!(
            service.available_filter_operations(),
            vec!["eq", "ne", "gt", "lt", "gte", "lte", "like"]
        );
    }
}
