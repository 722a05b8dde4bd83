//! Log Search
//!
//! Newest-first search over an OpenTelemetry logs table with optional level,
//! component and body-pattern filters. Rows go through the same decoder as
//! explore results.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LogsConfig;
use crate::engine::{EngineResult, QueryEngine, Statement};
use crate::explore::{DecodedRow, RowDecoder};

/// Row limit when none (or an unusable one) is given
pub const DEFAULT_LOG_LIMIT: u64 = 100;

/// Query-string parameters of `GET /logs`
///
/// `limit` and `offset` are kept as text so that garbage falls back to the
/// defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogQuery {
    pub level: Option<String>,
    pub component: Option<String>,
    pub pattern: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl LogQuery {
    /// The newest [`DEFAULT_LOG_LIMIT`] entries, unfiltered
    pub fn top100() -> Self {
        Self::default()
    }

    pub fn limit(&self) -> u64 {
        match self.limit.as_deref().map(|s| s.trim().parse::<i64>()) {
            Some(Ok(n)) if n > 0 => n as u64,
            _ => DEFAULT_LOG_LIMIT,
        }
    }

    pub fn offset(&self) -> u64 {
        match self.offset.as_deref().map(|s| s.trim().parse::<i64>()) {
            Some(Ok(n)) if n >= 0 => n as u64,
            _ => 0,
        }
    }
}

/// A log line as returned to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub line_id: String,
    pub timestamp: String,
    pub level: String,
    pub component: String,
    pub pid: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub event_id: String,
    pub raw_message: String,
}

impl LogEntry {
    fn from_row(row: &DecodedRow) -> Option<Self> {
        let text = |name: &str| row.get(name).and_then(|v| v.as_str()).map(str::to_string);
        Some(Self {
            line_id: text("line_id")?,
            timestamp: text("timestamp")?,
            level: text("level")?,
            component: text("component")?,
            pid: text("pid")?,
            content: text("content")?,
            event_id: text("event_id")?,
            raw_message: text("raw_message")?,
        })
    }
}

/// Log search over the configured table
#[derive(Clone)]
pub struct LogSearch {
    engine: Arc<dyn QueryEngine>,
    config: LogsConfig,
}

impl LogSearch {
    pub fn new(engine: Arc<dyn QueryEngine>, config: LogsConfig) -> Self {
        Self { engine, config }
    }

    /// Build the search statement
    pub fn statement(&self, query: &LogQuery) -> Statement {
        let mut sql = format!(
            "SELECT toString(rowNumberInAllBlocks()) AS line_id, \
             toString(Timestamp) AS timestamp, \
             toString(SeverityText) AS level, \
             toString(ServiceName) AS component, \
             toString(ResourceAttributes['process.pid']) AS pid, \
             Body AS content, \
             toString(cityHash64(Body)) AS event_id, \
             Body AS raw_message \
             FROM {} WHERE 1=1",
            self.config.table
        );
        let mut statement = Statement::new("");

        if let Some(level) = non_empty(&query.level) {
            statement = statement.arg(level);
            sql.push_str(&format!(
                " AND lower(SeverityText) = lower(${})",
                statement.args.len()
            ));
        }
        if let Some(component) = non_empty(&query.component) {
            statement = statement.arg(format!("%{}%", component));
            sql.push_str(&format!(
                " AND lower(ServiceName) LIKE lower(${})",
                statement.args.len()
            ));
        }
        if let Some(pattern) = non_empty(&query.pattern) {
            statement = statement.arg(format!("%{}%", pattern));
            sql.push_str(&format!(
                " AND lower(Body) LIKE lower(${})",
                statement.args.len()
            ));
        }

        sql.push_str(" ORDER BY Timestamp DESC");

        statement = statement.arg(query.limit());
        sql.push_str(&format!(" LIMIT ${}", statement.args.len()));

        let offset = query.offset();
        if offset > 0 {
            statement = statement.arg(offset);
            sql.push_str(&format!(" OFFSET ${}", statement.args.len()));
        }

        statement.sql = sql;
        match self.config.database {
            Some(ref database) => statement.in_database(database.as_str()),
            None => statement,
        }
    }

    pub async fn search(&self, query: &LogQuery) -> EngineResult<Vec<LogEntry>> {
        let statement = self.statement(query);
        tracing::debug!(sql = %statement.sql, args = statement.args.len(), "Searching logs");

        let decoded = RowDecoder::decode(self.engine.query(&statement).await?);
        let mut entries = Vec::with_capacity(decoded.rows.len());
        for row in &decoded.rows {
            match LogEntry::from_row(row) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!("Skipping log row with missing fields"),
            }
        }

        Ok(entries)
    }

    pub async fn top100(&self) -> EngineResult<Vec<LogEntry>> {
        self.search(&LogQuery::top100()).await
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ColumnMeta, MemoryEngine, QueryArg, ResultSet};
    use serde_json::json;

    const COLUMNS: [&str; 8] = [
        "line_id",
        "timestamp",
        "level",
        "component",
        "pid",
        "content",
        "event_id",
        "raw_message",
    ];

    fn log_rows() -> ResultSet {
        ResultSet::new(COLUMNS.iter().map(|c| ColumnMeta::new(*c, "String")).collect())
            .row(vec![
                json!("0"),
                json!("2024-01-15 10:30:00.000000000"),
                json!("ERROR"),
                json!("checkout"),
                json!("4242"),
                json!("payment timeout"),
                json!("1234567890"),
                json!("payment timeout"),
            ])
            .row(vec![
                json!("1"),
                json!("2024-01-15 10:29:59.000000000"),
                json!("INFO"),
                json!("checkout"),
                json!(""),
                json!("started"),
                json!(""),
                json!("started"),
            ])
    }

    fn search(engine: MemoryEngine) -> (Arc<MemoryEngine>, LogSearch) {
        let engine = Arc::new(engine);
        (engine.clone(), LogSearch::new(engine, LogsConfig::default()))
    }

    fn query(pairs: &[(&str, &str)]) -> LogQuery {
        let mut q = LogQuery::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "level" => q.level = v,
                "component" => q.component = v,
                "pattern" => q.pattern = v,
                "limit" => q.limit = v,
                "offset" => q.offset = v,
                _ => {}
            }
        }
        q
    }

    #[test]
    fn test_limit_and_offset_parsing() {
        assert_eq!(query(&[]).limit(), 100);
        assert_eq!(query(&[("limit", "25")]).limit(), 25);
        assert_eq!(query(&[("limit", "0")]).limit(), 100);
        assert_eq!(query(&[("limit", "-5")]).limit(), 100);
        assert_eq!(query(&[("limit", "abc")]).limit(), 100);

        assert_eq!(query(&[]).offset(), 0);
        assert_eq!(query(&[("offset", "40")]).offset(), 40);
        assert_eq!(query(&[("offset", "-1")]).offset(), 0);
        assert_eq!(query(&[("offset", "x")]).offset(), 0);
    }

    #[test]
    fn test_statement_without_filters() {
        let (_, logs) = search(MemoryEngine::new());
        let stmt = logs.statement(&LogQuery::top100());

        assert!(stmt.sql.contains("FROM otel_logs WHERE 1=1 ORDER BY Timestamp DESC LIMIT $1"));
        assert!(!stmt.sql.contains("OFFSET"));
        assert_eq!(stmt.args, vec![QueryArg::UInt(100)]);
        assert_eq!(stmt.database, None);
    }

    #[test]
    fn test_statement_with_filters() {
        let (_, logs) = search(MemoryEngine::new());
        let stmt = logs.statement(&query(&[
            ("level", "error"),
            ("component", "Check"),
            ("pattern", "timeout"),
            ("limit", "10"),
            ("offset", "20"),
        ]));

        assert!(stmt.sql.ends_with(
            "WHERE 1=1 AND lower(SeverityText) = lower($1) \
             AND lower(ServiceName) LIKE lower($2) \
             AND lower(Body) LIKE lower($3) \
             ORDER BY Timestamp DESC LIMIT $4 OFFSET $5"
        ));
        assert_eq!(
            stmt.args,
            vec![
                QueryArg::Str("error".to_string()),
                QueryArg::Str("%Check%".to_string()),
                QueryArg::Str("%timeout%".to_string()),
                QueryArg::UInt(10),
                QueryArg::UInt(20),
            ]
        );
    }

    #[test]
    fn test_configured_table_and_database() {
        let logs = LogSearch::new(
            Arc::new(MemoryEngine::new()),
            LogsConfig {
                table: "app_logs".to_string(),
                database: Some("otel".to_string()),
            },
        );
        let stmt = logs.statement(&LogQuery::top100());
        assert!(stmt.sql.contains("FROM app_logs WHERE"));
        assert_eq!(stmt.database.as_deref(), Some("otel"));
    }

    #[tokio::test]
    async fn test_search_decodes_entries() {
        let (_, logs) = search(MemoryEngine::new().on("FROM otel_logs", log_rows()));
        let entries = logs.top100().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, "ERROR");
        assert_eq!(entries[0].pid, "4242");
        assert_eq!(entries[1].event_id, "");

        let json = serde_json::to_value(&entries[1]).unwrap();
        assert!(json.get("eventId").is_none());
        assert_eq!(json["rawMessage"], "started");
        assert_eq!(json["lineId"], "1");
    }

    #[tokio::test]
    async fn test_search_skips_incomplete_rows() {
        let rs = ResultSet::new(vec![ColumnMeta::new("line_id", "String")]).row(vec![json!("0")]);
        let (_, logs) = search(MemoryEngine::new().on("FROM otel_logs", rs));
        assert!(logs.top100().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_failure() {
        let (_, logs) = search(MemoryEngine::new().fail_on("otel_logs", "Table doesn't exist"));
        assert!(logs.top100().await.is_err());
    }
}
