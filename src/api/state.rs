//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{ApiConfig, Config};
use crate::engine::QueryEngine;
use crate::explore::ExploreService;
use crate::logs::LogSearch;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Schema discovery, query building, raw SQL, autocomplete
    pub explore: Arc<ExploreService>,
    /// Log search
    pub logs: Arc<LogSearch>,
    /// The engine itself, for health checks
    pub engine: Arc<dyn QueryEngine>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Wire every service to one engine
    pub fn new(engine: Arc<dyn QueryEngine>, config: &Config) -> Self {
        Self {
            explore: Arc::new(ExploreService::new(engine.clone(), &config.explore)),
            logs: Arc::new(LogSearch::new(engine.clone(), config.logs.clone())),
            engine,
            config: Arc::new(config.server.clone()),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
