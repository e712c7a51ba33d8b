use sqlx::mysql::MySqlPool;
use std::sync::Arc;

use crate::cache::{CacheInvalidator, MemoryCache};
use crate::config::AppConfig;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: the pool is reference counted and the rest sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: MySqlPool,
    pub config: Arc<AppConfig>,
    /// Process-wide read cache, created at start-up and never persisted
    pub cache: Arc<MemoryCache>,
}

impl AppState {
    pub fn new(pool: MySqlPool, config: AppConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            cache: Arc::new(MemoryCache::new()),
        }
    }

    pub fn invalidator(&self) -> CacheInvalidator {
        CacheInvalidator::new(self.cache.clone())
    }
}
