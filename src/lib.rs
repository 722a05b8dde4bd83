//! # ObservIO
//!
//! HTTP explore API over a ClickHouse columnar store: schema discovery,
//! query building without SQL, read-only raw SQL, SQL autocomplete and log
//! search.
//!
//! ## Modules
//!
//! - [`engine`]: Query-execution collaborator and the ClickHouse HTTP client
//! - [`explore`]: Query builder, row decoder, raw SQL gateway, autocomplete
//! - [`logs`]: Log search over the OpenTelemetry logs table
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use observio::explore::{ExploreRequest, QueryBuilder};
//!
//! let built = QueryBuilder::default()
//!     .build(&ExploreRequest::new("default", "otel_logs").aggregate("count"))
//!     .unwrap();
//!
//! assert_eq!(built.sql, "SELECT COUNT(*) AS count FROM default.otel_logs LIMIT $1");
//! ```

pub mod api;
pub mod config;
pub mod engine;
pub mod explore;
pub mod logs;

// Re-export top-level types for convenience
pub use engine::{
    ClickHouseConfig, ClickHouseHttp, EngineError, EngineResult, MemoryEngine, QueryArg,
    QueryEngine, ResultSet, Statement,
};

pub use explore::{
    AutocompleteSuggestion, DecodedValue, ExploreError, ExploreRequest, ExploreResponse,
    ExploreService, QueryBuilder, RowDecoder, SqlGateway,
};

pub use logs::{LogEntry, LogQuery, LogSearch};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{ApiConfig, Config, ConfigError, ExploreConfig, LoggingConfig, LogsConfig};
