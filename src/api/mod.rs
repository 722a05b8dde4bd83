//! ObservIO REST API
//!
//! HTTP API layer, built with Axum.
//!
//! # Endpoints
//!
//! ## Explore
//! - `GET /api/v1/explore/databases` - List databases
//! - `GET /api/v1/explore/databases/:database/tables` - List tables
//! - `GET /api/v1/explore/databases/:database/tables/:table/fields` - List fields
//! - `GET /api/v1/explore/options` - Aggregates and filter operations
//! - `POST /api/v1/explore/query` - Run a structured query
//! - `POST /api/v1/explore/autocomplete` - SQL autocomplete
//! - `POST /api/v1/explore/execute-sql` - Run read-only raw SQL
//!
//! ## Logs
//! - `GET /api/v1/logs` - Search logs
//! - `GET /api/v1/logs/top100` - Newest 100 logs
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! # Example
//!
//! ```rust,ignore
//! use observio::api::{serve, AppState};
//! use observio::config::Config;
//! use observio::engine::{ClickHouseHttp, QueryEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let engine: Arc<dyn QueryEngine> = Arc::new(ClickHouseHttp::new(config.clickhouse.clone())?);
//!
//!     let state = AppState::new(engine, &config);
//!     serve(state, &config.server).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::ApiConfig;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Explore routes
        .route("/explore/databases", get(routes::explore::list_databases))
        .route(
            "/explore/databases/:database/tables",
            get(routes::explore::list_tables),
        )
        .route(
            "/explore/databases/:database/tables/:table/fields",
            get(routes::explore::list_fields),
        )
        .route("/explore/options", get(routes::explore::options))
        .route("/explore/query", post(routes::explore::execute_query))
        .route("/explore/autocomplete", post(routes::explore::autocomplete))
        .route("/explore/execute-sql", post(routes::explore::execute_sql))
        // Log routes, with and without trailing slash
        .route("/logs", get(routes::logs::search_logs))
        .route("/logs/", get(routes::logs::search_logs))
        .route("/logs/top100", get(routes::logs::top100));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let cors = cors_layer(&state.config.cors_origins);
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    // Create shared state
    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("ObservIO API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("ObservIO API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
