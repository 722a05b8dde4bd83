//! Engine Collaborator
//!
//! The columnar store as seen by the rest of the crate: something that runs a
//! parameterized statement and hands back column metadata plus undecoded rows.
//!
//! - **`QueryEngine`**: the collaborator trait
//! - **`ClickHouseHttp`**: implementation over the ClickHouse HTTP interface
//! - **`MemoryEngine`**: scripted in-memory fake
//! - **`EngineType`**: the engine's column type tags
//!
//! # Rows
//!
//! A [`RawRow`] is one row exactly as the engine sent it (a JSON array line).
//! Turning it into values is the decoder's job, so a malformed row fails on
//! its own without poisoning the result set. Anything that goes wrong while
//! reading the stream itself surfaces as an [`EngineError`].

mod clickhouse;
mod error;
mod memory;
mod types;

pub use clickhouse::{ClickHouseConfig, ClickHouseHttp};
pub use error::{EngineError, EngineResult};
pub use memory::MemoryEngine;
pub use types::EngineType;

use async_trait::async_trait;

/// A statement with positional `$1..$n` placeholders and their arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// SQL text
    pub sql: String,
    /// Arguments, in placeholder order
    pub args: Vec<QueryArg>,
    /// Default database for unqualified names
    pub database: Option<String>,
}

impl Statement {
    /// Create a statement without arguments
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
            database: None,
        }
    }

    /// Append a bound argument
    pub fn arg(mut self, arg: impl Into<QueryArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set the default database
    pub fn in_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }
}

/// A bound statement argument
#[derive(Debug, Clone, PartialEq)]
pub enum QueryArg {
    Str(String),
    Int(i64),
    UInt(u64),
}

impl QueryArg {
    /// Engine type name used when binding this argument
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "String",
            Self::Int(_) => "Int64",
            Self::UInt(_) => "UInt64",
        }
    }

    /// Value as sent on the wire
    pub fn to_param(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Int(n) => n.to_string(),
            Self::UInt(n) => n.to_string(),
        }
    }
}

impl From<&str> for QueryArg {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for QueryArg {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for QueryArg {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<u64> for QueryArg {
    fn from(n: u64) -> Self {
        Self::UInt(n)
    }
}

/// Name and declared type of a result column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    /// Engine type tag, e.g. `DateTime64(3)` or `LowCardinality(String)`
    pub type_name: String,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// One undecoded row: a JSON array line, one cell per column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow(String);

impl RawRow {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    /// Build a row from cell values
    pub fn from_cells(cells: Vec<serde_json::Value>) -> Self {
        Self(serde_json::Value::Array(cells).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Columns plus undecoded rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<RawRow>,
}

impl ResultSet {
    pub fn new(columns: Vec<ColumnMeta>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row built from cell values
    pub fn row(mut self, cells: Vec<serde_json::Value>) -> Self {
        self.rows.push(RawRow::from_cells(cells));
        self
    }

    /// Append an undecoded row verbatim
    pub fn raw_row(mut self, line: impl Into<String>) -> Self {
        self.rows.push(RawRow::new(line));
        self
    }
}

/// The query-execution collaborator
///
/// Implementations own connection pooling. Callers impose no extra locking,
/// and nothing here retries: a failed call is reported once.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Run a statement and return its result set
    async fn query(&self, statement: &Statement) -> EngineResult<ResultSet>;

    /// Check that the engine is reachable
    async fn ping(&self) -> EngineResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_statement_builder() {
        let stmt = Statement::new("SELECT name FROM system.tables WHERE database = $1")
            .arg("default")
            .in_database("default");

        assert_eq!(stmt.args, vec![QueryArg::Str("default".to_string())]);
        assert_eq!(stmt.database.as_deref(), Some("default"));
    }

    #[test]
    fn test_query_arg_binding_types() {
        assert_eq!(QueryArg::from("x").type_name(), "String");
        assert_eq!(QueryArg::from(-3i64).type_name(), "Int64");
        assert_eq!(QueryArg::from(1000u64).type_name(), "UInt64");
        assert_eq!(QueryArg::from(1000u64).to_param(), "1000");
    }

    #[test]
    fn test_raw_row_from_cells() {
        let row = RawRow::from_cells(vec![json!("a"), json!(1)]);
        assert_eq!(row.as_str(), r#"["a",1]"#);
    }
}
