//! Explore Routes
//!
//! Endpoints behind the query-builder UI.
//!
//! - GET /api/v1/explore/databases
//! - GET /api/v1/explore/databases/:database/tables
//! - GET /api/v1/explore/databases/:database/tables/:table/fields
//! - GET /api/v1/explore/options
//! - POST /api/v1/explore/query
//! - POST /api/v1/explore/autocomplete
//! - POST /api/v1/explore/execute-sql

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    AutocompleteRequest, AutocompleteResponse, DatabasesResponse, FieldsResponse, OptionsResponse,
    RawSqlRequest, RawSqlResponse, TablesResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::explore::{ExploreRequest, ExploreResponse};

/// GET /api/v1/explore/databases
pub async fn list_databases(State(state): State<Arc<AppState>>) -> ApiResult<Json<DatabasesResponse>> {
    let databases = state
        .explore
        .databases()
        .await
        .map_err(|e| ApiError::explore(e, "Could not fetch databases"))?;

    tracing::debug!(count = databases.len(), "Fetched databases");
    Ok(Json(DatabasesResponse { databases }))
}

/// GET /api/v1/explore/databases/:database/tables
pub async fn list_tables(
    State(state): State<Arc<AppState>>,
    Path(database): Path<String>,
) -> ApiResult<Json<TablesResponse>> {
    let tables = state
        .explore
        .tables(&database)
        .await
        .map_err(|e| ApiError::explore(e, "Could not fetch tables"))?;

    tracing::debug!(database = %database, count = tables.len(), "Fetched tables");
    Ok(Json(TablesResponse { tables }))
}

/// GET /api/v1/explore/databases/:database/tables/:table/fields
///
/// Identifier-like columns are left out.
pub async fn list_fields(
    State(state): State<Arc<AppState>>,
    Path((database, table)): Path<(String, String)>,
) -> ApiResult<Json<FieldsResponse>> {
    let fields = state
        .explore
        .fields(&database, &table)
        .await
        .map_err(|e| ApiError::explore(e, "Could not fetch table fields"))?;

    tracing::debug!(database = %database, table = %table, count = fields.len(), "Fetched fields");
    Ok(Json(FieldsResponse { fields }))
}

/// GET /api/v1/explore/options
pub async fn options(State(state): State<Arc<AppState>>) -> Json<OptionsResponse> {
    Json(OptionsResponse {
        aggregates: state.explore.available_aggregates(),
        filter_operations: state.explore.available_filter_operations(),
    })
}

/// POST /api/v1/explore/query
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ExploreRequest>, JsonRejection>,
) -> ApiResult<Json<ExploreResponse>> {
    let Json(request) = payload?;

    let response = state
        .explore
        .execute(&request)
        .await
        .map_err(|e| ApiError::explore(e, "Could not execute query"))?;

    Ok(Json(response))
}

/// POST /api/v1/explore/autocomplete
pub async fn autocomplete(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AutocompleteRequest>, JsonRejection>,
) -> ApiResult<Json<AutocompleteResponse>> {
    let Json(request) = payload?;

    let suggestions = state
        .explore
        .autocomplete(&request.database, &request.query, request.position)
        .await
        .map_err(|e| ApiError::explore(e, "Could not get autocomplete suggestions"))?;

    Ok(Json(AutocompleteResponse { suggestions }))
}

/// POST /api/v1/explore/execute-sql
///
/// Statements starting with a write keyword are refused with 400.
pub async fn execute_sql(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawSqlRequest>, JsonRejection>,
) -> ApiResult<Json<RawSqlResponse>> {
    let Json(request) = payload?;

    let result = state
        .explore
        .execute_sql(&request.database, &request.query)
        .await
        .map_err(|e| ApiError::explore(e, "Failed to execute query"))?;

    Ok(Json(RawSqlResponse::new(result, request.query)))
}
