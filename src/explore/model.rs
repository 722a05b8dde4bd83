//! Explore Data Model
//!
//! The wire-level [`ExploreRequest`] as sent by the query-builder UI, the
//! enums it is made of, and [`ExploreSpec`], the validated form the builder
//! renders from.
//!
//! Enum-valued fields arrive as plain strings so that an unsupported value is
//! reported as a validation error naming the field, not as an unreadable body.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::explore::decoder::{DecodedResult, DecodedRow};
use crate::explore::error::{ExploreError, ExploreResult};

/// Structured description of a query to translate into SQL
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreRequest {
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub table: String,
    /// Columns to select; empty selects all columns
    #[serde(default, deserialize_with = "null_as_empty")]
    pub fields: Vec<String>,
    /// none | count | sum | avg | min | max
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub group_by: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    /// asc | desc
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_by: Option<String>,
    /// eq | ne | gt | lt | gte | lte | like
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_val: Option<String>,
    /// 0 means the execution default
    #[serde(default)]
    pub limit: i64,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ExploreRequest {
    /// Request selecting all columns of a table, ascending, default limit
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            table: table.into(),
            order_dir: Some("asc".to_string()),
            ..Default::default()
        }
    }

    pub fn fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn aggregate(mut self, aggregate: impl Into<String>) -> Self {
        self.aggregate = Some(aggregate.into());
        self
    }

    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group_by = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, dir: impl Into<String>) -> Self {
        self.order_by = Some(column.into());
        self.order_dir = Some(dir.into());
        self
    }

    pub fn filter(
        mut self,
        column: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.filter_by = Some(column.into());
        self.filter_op = Some(op.into());
        self.filter_val = Some(value.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    /// Validate into an [`ExploreSpec`]
    ///
    /// Checks required names, enum values, the filter triple, the limit range
    /// and the lexical shape of every identifier.
    pub fn validate(&self, max_limit: u32) -> ExploreResult<ExploreSpec> {
        let rules = IdentifierRules::new()?;

        let database = self.database.trim();
        if database.is_empty() {
            return Err(ExploreError::validation("database is required"));
        }
        let table = self.table.trim();
        if table.is_empty() {
            return Err(ExploreError::validation("table is required"));
        }
        rules.check_name("database", database)?;
        rules.check_name("table", table)?;

        let aggregate = match non_empty(&self.aggregate) {
            None => None,
            Some(s) if s.eq_ignore_ascii_case("none") => None,
            Some(s) => Some(Aggregate::parse(s).ok_or_else(|| {
                ExploreError::validation(format!("invalid aggregate function: {}", s))
            })?),
        };

        if let Some(agg) = aggregate {
            if agg.needs_field() && self.fields.is_empty() {
                return Err(ExploreError::validation(format!(
                    "fields are required for aggregate function: {}",
                    agg.name()
                )));
            }
        }

        let filter = self.validate_filter()?;

        let order_dir = match non_empty(&self.order_dir) {
            None => OrderDir::Asc,
            Some(s) => OrderDir::parse(s).ok_or_else(|| {
                ExploreError::validation(format!(
                    "invalid order direction: {} (must be 'asc' or 'desc')",
                    s
                ))
            })?,
        };

        if self.limit < 0 {
            return Err(ExploreError::validation("limit cannot be negative"));
        }
        if self.limit > i64::from(max_limit) {
            return Err(ExploreError::validation(format!(
                "limit cannot exceed {} rows",
                max_limit
            )));
        }

        for field in &self.fields {
            rules.check_column("fields", field)?;
        }
        for column in &self.group_by {
            rules.check_column("groupBy", column)?;
        }
        let order_by = non_empty(&self.order_by).map(str::to_string);
        if let Some(ref column) = order_by {
            rules.check_column("orderBy", column)?;
        }
        if let Some(ref f) = filter {
            rules.check_column("filterBy", &f.column)?;
        }

        Ok(ExploreSpec {
            database: database.to_string(),
            table: table.to_string(),
            fields: self.fields.clone(),
            aggregate,
            group_by: self.group_by.clone(),
            order_by,
            order_dir,
            filter,
            limit: self.limit as u32,
        })
    }

    fn validate_filter(&self) -> ExploreResult<Option<Filter>> {
        let by = non_empty(&self.filter_by);
        let op = non_empty(&self.filter_op);
        let val = non_empty(&self.filter_val);

        match (by, op, val) {
            (None, None, None) => Ok(None),
            (Some(by), Some(op), Some(val)) => {
                let op = FilterOp::parse(op).ok_or_else(|| {
                    ExploreError::validation(format!("invalid filter operation: {}", op))
                })?;
                Ok(Some(Filter {
                    column: by.to_string(),
                    op,
                    value: val.to_string(),
                }))
            }
            (by, op, val) => {
                let missing: Vec<&str> = [("filterBy", by), ("filterOp", op), ("filterVal", val)]
                    .iter()
                    .filter(|(_, v)| v.is_none())
                    .map(|(name, _)| *name)
                    .collect();
                Err(ExploreError::validation(format!(
                    "filterBy, filterOp and filterVal must be set together (missing: {})",
                    missing.join(", ")
                )))
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Lexical identifier checks applied before anything is interpolated
struct IdentifierRules {
    name: Regex,
    column: Regex,
}

impl IdentifierRules {
    fn new() -> ExploreResult<Self> {
        let name = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$")
            .map_err(|e| ExploreError::validation(format!("identifier rules: {}", e)))?;
        let column = Regex::new(r"^[A-Za-z_][A-Za-z0-9_.]*$")
            .map_err(|e| ExploreError::validation(format!("identifier rules: {}", e)))?;
        Ok(Self { name, column })
    }

    fn check_name(&self, field: &str, value: &str) -> ExploreResult<()> {
        if self.name.is_match(value) {
            Ok(())
        } else {
            Err(ExploreError::validation(format!(
                "invalid identifier in {}: '{}'",
                field, value
            )))
        }
    }

    fn check_column(&self, field: &str, value: &str) -> ExploreResult<()> {
        if self.column.is_match(value) {
            Ok(())
        } else {
            Err(ExploreError::validation(format!(
                "invalid identifier in {}: '{}'",
                field, value
            )))
        }
    }
}

/// Aggregate functions offered by the query builder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub const ALL: [Aggregate; 5] = [Self::Count, Self::Sum, Self::Avg, Self::Min, Self::Max];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "avg" => Some(Self::Avg),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    /// Lowercase name, also used as the result alias prefix
    pub fn name(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Numeric aggregates target `fields[0]`; COUNT(*) needs no field
    pub fn needs_field(&self) -> bool {
        !matches!(self, Self::Count)
    }
}

impl std::fmt::Display for Aggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name().to_uppercase())
    }
}

/// Filter comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Gte,
    Lte,
    Like,
}

impl FilterOp {
    pub const ALL: [FilterOp; 7] = [
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Lt,
        Self::Gte,
        Self::Lte,
        Self::Like,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "eq" => Some(Self::Eq),
            "ne" => Some(Self::Ne),
            "gt" => Some(Self::Gt),
            "lt" => Some(Self::Lt),
            "gte" => Some(Self::Gte),
            "lte" => Some(Self::Lte),
            "like" => Some(Self::Like),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Like => "like",
        }
    }

    /// SQL operator text
    pub fn sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Gte => ">=",
            Self::Lte => "<=",
            Self::Like => "LIKE",
        }
    }

    /// Value to bind for a filter value. LIKE matches substrings.
    pub fn bind_value(&self, value: &str) -> String {
        match self {
            Self::Like => format!("%{}%", value),
            _ => value.to_string(),
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDir {
    #[default]
    Asc,
    Desc,
}

impl OrderDir {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A validated single-column filter
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

/// A validated explore request
#[derive(Debug, Clone, PartialEq)]
pub struct ExploreSpec {
    pub database: String,
    pub table: String,
    pub fields: Vec<String>,
    pub aggregate: Option<Aggregate>,
    pub group_by: Vec<String>,
    pub order_by: Option<String>,
    pub order_dir: OrderDir,
    pub filter: Option<Filter>,
    /// 0 means the execution default
    pub limit: u32,
}

impl ExploreSpec {
    /// Every column name the request refers to
    pub fn referenced_columns(&self) -> Vec<(&'static str, &str)> {
        let mut columns: Vec<(&'static str, &str)> = Vec::new();
        columns.extend(self.fields.iter().map(|c| ("fields", c.as_str())));
        columns.extend(self.group_by.iter().map(|c| ("groupBy", c.as_str())));
        if let Some(ref c) = self.order_by {
            columns.push(("orderBy", c.as_str()));
        }
        if let Some(ref f) = self.filter {
            columns.push(("filterBy", f.column.as_str()));
        }
        columns
    }
}

/// Explore query response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExploreResponse {
    pub columns: Vec<String>,
    pub data: Vec<DecodedRow>,
    /// Number of rows in `data`, not a server-side count
    pub total: usize,
}

impl From<DecodedResult> for ExploreResponse {
    fn from(result: DecodedResult) -> Self {
        let total = result.rows.len();
        Self {
            columns: result.columns,
            data: result.rows,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> ExploreRequest {
        ExploreRequest::new("default", "otel_logs")
    }

    #[test]
    fn test_convenience_constructor() {
        let req = base();
        assert!(req.fields.is_empty());
        assert_eq!(req.limit, 0);
        assert_eq!(req.order_dir.as_deref(), Some("asc"));

        let spec = req.validate(10_000).unwrap();
        assert_eq!(spec.limit, 0);
        assert_eq!(spec.aggregate, None);
    }

    #[test]
    fn test_deserialize_camel_case() {
        let req: ExploreRequest = serde_json::from_str(
            r#"{"database":"default","table":"otel_logs","fields":null,
                "aggregate":"count","groupBy":["level"],"filterBy":"level",
                "filterOp":"eq","filterVal":"error","limit":50}"#,
        )
        .unwrap();

        assert!(req.fields.is_empty());
        assert_eq!(req.group_by, vec!["level"]);
        assert_eq!(req.filter_val.as_deref(), Some("error"));
        assert_eq!(req.limit, 50);
    }

    #[test]
    fn test_required_names() {
        let err = ExploreRequest::new("", "t").validate(10_000).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: database is required");

        let err = ExploreRequest::new("db", "  ").validate(10_000).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: table is required");
    }

    #[test]
    fn test_aggregate_validation() {
        let err = base().aggregate("median").validate(10_000).unwrap_err();
        assert!(err.to_string().contains("invalid aggregate function: median"));

        let err = base().aggregate("sum").validate(10_000).unwrap_err();
        assert!(err.to_string().contains("fields are required for aggregate function: sum"));

        assert!(base().aggregate("count").validate(10_000).is_ok());
        let spec = base().aggregate("none").validate(10_000).unwrap();
        assert_eq!(spec.aggregate, None);
    }

    #[test]
    fn test_partial_filter_rejected() {
        let mut req = base();
        req.filter_by = Some("level".to_string());
        req.filter_op = Some("eq".to_string());

        let err = req.validate(10_000).unwrap_err();
        assert!(err.to_string().contains("missing: filterVal"));
    }

    #[test]
    fn test_invalid_filter_op() {
        let err = base()
            .filter("level", "regex", "err.*")
            .validate(10_000)
            .unwrap_err();
        assert!(err.to_string().contains("invalid filter operation: regex"));
    }

    #[test]
    fn test_order_direction() {
        let spec = base().order_by("Timestamp", "DESC").validate(10_000).unwrap();
        assert_eq!(spec.order_dir, OrderDir::Desc);

        let err = base().order_by("Timestamp", "down").validate(10_000).unwrap_err();
        assert!(err.to_string().contains("invalid order direction: down"));
    }

    #[test]
    fn test_limit_bounds() {
        assert!(base().limit(0).validate(10_000).is_ok());
        assert!(base().limit(10_000).validate(10_000).is_ok());

        let err = base().limit(-1).validate(10_000).unwrap_err();
        assert!(err.to_string().contains("limit cannot be negative"));

        let err = base().limit(10_001).validate(10_000).unwrap_err();
        assert!(err.to_string().contains("limit cannot exceed 10000 rows"));
    }

    #[test]
    fn test_identifier_shapes() {
        let err = ExploreRequest::new("default", "logs; DROP TABLE x")
            .validate(10_000)
            .unwrap_err();
        assert!(err.to_string().contains("invalid identifier in table"));

        let err = base().fields(&["Body) FROM secrets --"]).validate(10_000).unwrap_err();
        assert!(err.to_string().contains("invalid identifier in fields"));

        assert!(base()
            .fields(&["ResourceAttributes.keys", "_ts"])
            .validate(10_000)
            .is_ok());
    }

    #[test]
    fn test_referenced_columns() {
        let spec = base()
            .fields(&["Body"])
            .group_by(&["ServiceName"])
            .order_by("Timestamp", "asc")
            .filter("SeverityText", "eq", "ERROR")
            .validate(10_000)
            .unwrap();

        assert_eq!(
            spec.referenced_columns(),
            vec![
                ("fields", "Body"),
                ("groupBy", "ServiceName"),
                ("orderBy", "Timestamp"),
                ("filterBy", "SeverityText"),
            ]
        );
    }

    #[test]
    fn test_filter_op_binding() {
        assert_eq!(FilterOp::Like.bind_value("timeout"), "%timeout%");
        assert_eq!(FilterOp::Eq.bind_value("timeout"), "timeout");
        assert_eq!(FilterOp::Lte.sql(), "<=");
    }
}
