//! Log Routes
//!
//! - GET /api/v1/logs?level=&component=&pattern=&limit=&offset=
//! - GET /api/v1/logs/top100

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::logs::{LogEntry, LogQuery};

/// GET /api/v1/logs
pub async fn search_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> ApiResult<Json<Vec<LogEntry>>> {
    let entries = state
        .logs
        .search(&query)
        .await
        .map_err(|e| ApiError::engine(e, "Could not fetch logs"))?;

    Ok(Json(entries))
}

/// GET /api/v1/logs/top100
pub async fn top100(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<LogEntry>>> {
    let entries = state
        .logs
        .top100()
        .await
        .map_err(|e| ApiError::engine(e, "Could not fetch logs"))?;

    Ok(Json(entries))
}
