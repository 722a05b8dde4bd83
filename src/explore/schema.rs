//! Schema Introspector
//!
//! Lists databases, tables and columns from the engine's `system` tables.
//! Nothing is cached: every call is a fresh metadata query.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::{QueryEngine, Statement};
use crate::explore::decoder::{DecodedResult, RowDecoder};
use crate::explore::error::{ExploreError, ExploreResult};
use crate::explore::model::ExploreSpec;

const DATABASES_SQL: &str = "SELECT name FROM system.databases \
     WHERE name NOT IN ('system', 'INFORMATION_SCHEMA', 'information_schema') ORDER BY name";

const TABLES_SQL: &str = "SELECT name FROM system.tables WHERE database = $1 ORDER BY name";

const COLUMNS_SQL: &str =
    "SELECT name, type FROM system.columns WHERE database = $1 AND table = $2 ORDER BY name";

/// A column and its engine type tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableField {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TableField {
    /// Identifier-like columns are hidden from field listings
    pub fn is_identifier_like(&self) -> bool {
        self.name.to_lowercase().contains("id")
    }
}

/// Metadata queries against the engine
#[derive(Clone)]
pub struct SchemaIntrospector {
    engine: Arc<dyn QueryEngine>,
}

impl SchemaIntrospector {
    pub fn new(engine: Arc<dyn QueryEngine>) -> Self {
        Self { engine }
    }

    /// User databases, by name
    pub async fn databases(&self) -> ExploreResult<Vec<String>> {
        let result = self.run(Statement::new(DATABASES_SQL)).await?;
        Ok(strings(&result, "name"))
    }

    /// Tables of a database, by name
    pub async fn tables(&self, database: &str) -> ExploreResult<Vec<String>> {
        let result = self.run(Statement::new(TABLES_SQL).arg(database)).await?;
        Ok(strings(&result, "name"))
    }

    /// Every column of a table, identifier-like ones included
    pub async fn columns(&self, database: &str, table: &str) -> ExploreResult<Vec<TableField>> {
        let result = self
            .run(Statement::new(COLUMNS_SQL).arg(database).arg(table))
            .await?;

        Ok(result
            .rows
            .iter()
            .filter_map(|row| {
                Some(TableField {
                    name: row.get("name")?.as_str()?.to_string(),
                    type_name: row.get("type")?.as_str()?.to_string(),
                })
            })
            .collect())
    }

    /// Columns offered to the query builder
    pub async fn fields(&self, database: &str, table: &str) -> ExploreResult<Vec<TableField>> {
        let mut fields = self.columns(database, table).await?;
        fields.retain(|f| !f.is_identifier_like());
        Ok(fields)
    }

    /// Check every column a request refers to against the table's columns
    pub async fn check_identifiers(&self, spec: &ExploreSpec) -> ExploreResult<()> {
        let columns = self.columns(&spec.database, &spec.table).await?;
        if columns.is_empty() {
            return Err(ExploreError::validation(format!(
                "unknown table: {}.{}",
                spec.database, spec.table
            )));
        }

        let known: HashMap<&str, &str> = columns
            .iter()
            .map(|c| (c.name.as_str(), c.type_name.as_str()))
            .collect();

        for (field, column) in spec.referenced_columns() {
            if !known.contains_key(column) {
                return Err(ExploreError::validation(format!(
                    "unknown column in {}: '{}'",
                    field, column
                )));
            }
        }

        Ok(())
    }

    async fn run(&self, statement: Statement) -> ExploreResult<DecodedResult> {
        let result = self.engine.query(&statement).await?;
        Ok(RowDecoder::decode(result))
    }
}

fn strings(result: &DecodedResult, column: &str) -> Vec<String> {
    result
        .rows
        .iter()
        .filter_map(|row| row.get(column)?.as_str().map(str::to_string))
        .collect()
}
