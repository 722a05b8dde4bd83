//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use serde::{Deserialize, Serialize};

use crate::explore::{AutocompleteSuggestion, DecodedResult, DecodedRow, TableField};

// ============================================
// SCHEMA DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct DatabasesResponse {
    pub databases: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    pub fields: Vec<TableField>,
}

/// Values accepted by the query builder
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsResponse {
    pub aggregates: Vec<&'static str>,
    pub filter_operations: Vec<&'static str>,
}

// ============================================
// AUTOCOMPLETE DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct AutocompleteRequest {
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub query: String,
    /// Cursor offset in characters
    #[serde(default)]
    pub position: i64,
}

#[derive(Debug, Serialize)]
pub struct AutocompleteResponse {
    pub suggestions: Vec<AutocompleteSuggestion>,
}

// ============================================
// RAW SQL DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct RawSqlRequest {
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct RawSqlResponse {
    pub columns: Vec<String>,
    pub rows: Vec<DecodedRow>,
    pub total: usize,
    /// The statement as received
    pub query: String,
}

impl RawSqlResponse {
    pub fn new(result: DecodedResult, query: String) -> Self {
        Self {
            total: result.rows.len(),
            columns: result.columns,
            rows: result.rows,
            query,
        }
    }
}

// ============================================
// HEALTH DTOs
// ============================================

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "degraded"
    pub status: String,
    /// Engine status: "ok" or "error"
    pub engine: String,
    /// Uptime in seconds
    pub uptime_seconds: u64,
    /// Version string
    pub version: String,
}
