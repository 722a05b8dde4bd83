//! In-memory engine
//!
//! A scripted [`QueryEngine`] that answers statements by SQL fragment and
//! records everything it was asked to run. Used by tests and for running the
//! API without a store.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::{QueryEngine, ResultSet, Statement};

#[derive(Debug, Clone)]
enum Scripted {
    Rows(ResultSet),
    Fail(String),
}

/// Scripted fake engine
#[derive(Debug, Default)]
pub struct MemoryEngine {
    /// (sql fragment, response), first match wins
    script: Mutex<Vec<(String, Scripted)>>,
    /// Every statement received, in order
    executed: Mutex<Vec<Statement>>,
    ping_fails: AtomicBool,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer statements containing `fragment` with `result`
    pub fn on(self, fragment: impl Into<String>, result: ResultSet) -> Self {
        lock(&self.script).push((fragment.into(), Scripted::Rows(result)));
        self
    }

    /// Fail statements containing `fragment` with a server error
    pub fn fail_on(self, fragment: impl Into<String>, message: impl Into<String>) -> Self {
        lock(&self.script).push((fragment.into(), Scripted::Fail(message.into())));
        self
    }

    /// Make [`QueryEngine::ping`] fail
    pub fn with_ping_failure(self) -> Self {
        self.ping_fails.store(true, Ordering::SeqCst);
        self
    }

    /// Statements received so far
    pub fn executed(&self) -> Vec<Statement> {
        lock(&self.executed).clone()
    }

    /// Number of received statements whose SQL contains `fragment`
    pub fn count_matching(&self, fragment: &str) -> usize {
        lock(&self.executed)
            .iter()
            .filter(|s| s.sql.contains(fragment))
            .count()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl QueryEngine for MemoryEngine {
    async fn query(&self, statement: &Statement) -> EngineResult<ResultSet> {
        lock(&self.executed).push(statement.clone());

        let response = lock(&self.script)
            .iter()
            .find(|(fragment, _)| statement.sql.contains(fragment.as_str()))
            .map(|(_, scripted)| scripted.clone());

        match response {
            Some(Scripted::Rows(rs)) => Ok(rs),
            Some(Scripted::Fail(message)) => Err(EngineError::Server {
                status: 500,
                message,
            }),
            None => Err(EngineError::Unscripted(statement.sql.clone())),
        }
    }

    async fn ping(&self) -> EngineResult<()> {
        if self.ping_fails.load(Ordering::SeqCst) {
            Err(EngineError::Unavailable("ping disabled".to_string()))
        } else {
            Ok(())
        }
    }
}
