//! Query Builder
//!
//! Renders a validated [`ExploreSpec`] into a parameterized statement.
//!
//! ```text
//! SELECT <agg | group keys | fields | *> FROM <db>.<table>
//!   [WHERE <col> <op> $n] [GROUP BY ...] [ORDER BY <col> ASC|DESC] LIMIT $n
//! ```
//!
//! Values are always bound; identifiers have passed the lexical allowlist by
//! the time they get here and are interpolated as given.

use crate::engine::{QueryArg, Statement};
use crate::explore::error::ExploreResult;
use crate::explore::model::{Aggregate, ExploreRequest, ExploreSpec};

/// Default row limit when a request leaves `limit` at 0
pub const DEFAULT_LIMIT: u32 = 1000;

/// Largest row limit a request may ask for
pub const MAX_LIMIT: u32 = 10_000;

/// SQL text plus positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub args: Vec<QueryArg>,
}

impl BuiltQuery {
    pub fn into_statement(self) -> Statement {
        Statement {
            sql: self.sql,
            args: self.args,
            database: None,
        }
    }
}

/// Translates explore requests into SQL
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder {
    default_limit: u32,
    max_limit: u32,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, MAX_LIMIT)
    }
}

impl QueryBuilder {
    pub fn new(default_limit: u32, max_limit: u32) -> Self {
        Self {
            default_limit,
            max_limit,
        }
    }

    /// Validate a request and render it
    pub fn build(&self, request: &ExploreRequest) -> ExploreResult<BuiltQuery> {
        let spec = self.validate(request)?;
        Ok(self.render(&spec))
    }

    pub fn validate(&self, request: &ExploreRequest) -> ExploreResult<ExploreSpec> {
        request.validate(self.max_limit)
    }

    /// Render an already validated request
    pub fn render(&self, spec: &ExploreSpec) -> BuiltQuery {
        let mut args = Args::default();
        let mut sql = String::with_capacity(128);

        sql.push_str("SELECT ");
        sql.push_str(&select_list(spec));
        sql.push_str(&format!(" FROM {}.{}", spec.database, spec.table));

        if let Some(ref filter) = spec.filter {
            let placeholder = args.bind(filter.op.bind_value(&filter.value));
            sql.push_str(&format!(
                " WHERE {} {} {}",
                filter.column,
                filter.op.sql(),
                placeholder
            ));
        }

        if !spec.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&spec.group_by.join(", "));
        }

        if let Some(ref column) = spec.order_by {
            sql.push_str(&format!(" ORDER BY {} {}", column, spec.order_dir.sql()));
        }

        let limit = if spec.limit > 0 {
            spec.limit
        } else {
            self.default_limit
        };
        let placeholder = args.bind(u64::from(limit));
        sql.push_str(&format!(" LIMIT {}", placeholder));

        BuiltQuery {
            sql,
            args: args.into_inner(),
        }
    }
}

fn select_list(spec: &ExploreSpec) -> String {
    match spec.aggregate {
        Some(aggregate) => {
            let mut items = vec![aggregate_expr(aggregate, spec.fields.first())];
            items.extend(spec.group_by.iter().cloned());
            items.join(", ")
        }
        None if spec.fields.is_empty() => "*".to_string(),
        None => spec.fields.join(", "),
    }
}

fn aggregate_expr(aggregate: Aggregate, field: Option<&String>) -> String {
    match (aggregate, field) {
        (Aggregate::Count, _) | (_, None) => "COUNT(*) AS count".to_string(),
        (agg, Some(field)) => format!(
            "{}({}) AS {}_{}",
            agg,
            field,
            agg.name(),
            field.replace('.', "_")
        ),
    }
}

/// Positional argument collector handing out `$1..$n`
#[derive(Default)]
struct Args(Vec<QueryArg>);

impl Args {
    fn bind(&mut self, value: impl Into<QueryArg>) -> String {
        self.0.push(value.into());
        format!("${}", self.0.len())
    }

    fn into_inner(self) -> Vec<QueryArg> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(request: ExploreRequest) -> BuiltQuery {
        QueryBuilder::default().build(&request).unwrap()
    }

    #[test]
    fn test_count_uses_default_limit() {
        let q = build(ExploreRequest::new("default", "otel_logs").aggregate("count"));
        assert_eq!(q.sql, "SELECT COUNT(*) AS count FROM default.otel_logs LIMIT $1");
        assert_eq!(q.args, vec![QueryArg::UInt(1000)]);
    }

    #[test]
    fn test_count_ignores_fields() {
        let q = build(
            ExploreRequest::new("default", "otel_logs")
                .fields(&["Body"])
                .aggregate("count")
                .limit(5),
        );
        assert_eq!(q.sql, "SELECT COUNT(*) AS count FROM default.otel_logs LIMIT $1");
        assert_eq!(q.args, vec![QueryArg::UInt(5)]);
    }

    #[test]
    fn test_select_all_and_fields() {
        let q = build(ExploreRequest::new("default", "otel_logs"));
        assert_eq!(q.sql, "SELECT * FROM default.otel_logs LIMIT $1");

        let q = build(ExploreRequest::new("default", "otel_logs").fields(&["Timestamp", "Body"]));
        assert_eq!(q.sql, "SELECT Timestamp, Body FROM default.otel_logs LIMIT $1");
    }

    #[test]
    fn test_filter_binds_value() {
        let q = build(ExploreRequest::new("default", "otel_logs").filter("level", "eq", "error"));
        assert_eq!(
            q.sql,
            "SELECT * FROM default.otel_logs WHERE level = $1 LIMIT $2"
        );
        assert_eq!(
            q.args,
            vec![QueryArg::Str("error".to_string()), QueryArg::UInt(1000)]
        );
    }

    #[test]
    fn test_like_wraps_value() {
        let q = build(ExploreRequest::new("default", "otel_logs").filter("Body", "like", "timeout"));
        assert!(q.sql.contains(" WHERE Body LIKE $1"));
        assert_eq!(q.args[0], QueryArg::Str("%timeout%".to_string()));

        for (op, sql) in [("ne", "!="), ("gt", ">"), ("lt", "<"), ("gte", ">="), ("lte", "<=")] {
            let q = build(ExploreRequest::new("default", "t").filter("n", op, "5"));
            assert!(q.sql.contains(&format!(" WHERE n {} $1", sql)), "{}", q.sql);
            assert_eq!(q.args[0], QueryArg::Str("5".to_string()));
        }
    }

    #[test]
    fn test_aggregate_with_group_and_order() {
        let q = build(
            ExploreRequest::new("default", "requests")
                .fields(&["duration"])
                .aggregate("avg")
                .group_by(&["service", "route"])
                .order_by("service", "desc")
                .limit(50),
        );
        assert_eq!(
            q.sql,
            "SELECT AVG(duration) AS avg_duration, service, route FROM default.requests \
             GROUP BY service, route ORDER BY service DESC LIMIT $1"
        );
        assert_eq!(q.args, vec![QueryArg::UInt(50)]);
    }

    #[test]
    fn test_dotted_column_alias() {
        let q = build(
            ExploreRequest::new("default", "spans")
                .fields(&["attrs.latency"])
                .aggregate("max"),
        );
        assert!(q.sql.starts_with("SELECT MAX(attrs.latency) AS max_attrs_latency FROM"));
    }

    #[test]
    fn test_order_defaults_to_asc() {
        let mut request = ExploreRequest::new("default", "t");
        request.order_by = Some("ts".to_string());
        request.order_dir = None;
        let q = build(request);
        assert!(q.sql.contains(" ORDER BY ts ASC LIMIT"));
    }

    #[test]
    fn test_build_rejects_invalid_requests() {
        let builder = QueryBuilder::default();

        let err = builder
            .build(&ExploreRequest::new("default", "t").aggregate("median"))
            .unwrap_err();
        assert!(err.is_validation());

        let err = builder
            .build(&ExploreRequest::new("default", "t").limit(10_001))
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: limit cannot exceed 10000 rows");

        let err = builder
            .build(&ExploreRequest::new("default", "t; DROP TABLE t"))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_custom_limits() {
        let builder = QueryBuilder::new(10, 20);
        let q = builder.build(&ExploreRequest::new("default", "t")).unwrap();
        assert_eq!(q.args, vec![QueryArg::UInt(10)]);
        assert!(builder.build(&ExploreRequest::new("default", "t").limit(21)).is_err());
    }
}
