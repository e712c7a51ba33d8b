//! In-process TTL cache for public reads, plus the invalidation hooks the
//! record services call after every write.
//!
//! The cache lives for the life of the process (one instance held in
//! `AppState`) and is never persisted or shared between server instances.

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub mod keys;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Value,
    pub timestamp: Instant,
    pub ttl: Duration,
    /// Revalidation tags; `path:/blog` style tags stand for rendered pages
    pub tags: Vec<String>,
}

impl CacheEntry {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.timestamp) >= self.ttl
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // entries are replaced whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the cached value, evicting it first if it has expired
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock();
        let expired = entries.get(key)?.is_expired(Instant::now());
        if expired {
            entries.remove(key);
            tracing::trace!(key, "cache entry expired");
            return None;
        }
        entries.get(key).map(|e| e.data.clone())
    }

    pub fn set(&self, key: impl Into<String>, data: Value, ttl: Duration) {
        self.set_tagged(key, data, ttl, Vec::new());
    }

    pub fn set_tagged(&self, key: impl Into<String>, data: Value, ttl: Duration, tags: Vec<String>) {
        let entry = CacheEntry { data, timestamp: Instant::now(), ttl, tags };
        self.lock().insert(key.into(), entry);
    }

    /// Read-through: return the cached value or run `load` and cache its result.
    /// Errors are passed through and never cached. The lock is not held while
    /// loading, so two concurrent misses may both hit the database.
    pub async fn get_or_load<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        tags: Vec<String>,
        load: F,
    ) -> Result<Value, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(hit) = self.get(key) {
            tracing::trace!(key, "cache hit");
            return Ok(hit);
        }
        let data = load().await?;
        self.set_tagged(key, data.clone(), ttl, tags);
        Ok(data)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Remove every key starting with `prefix`; returns how many were dropped
    pub fn delete_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|k, _| !k.starts_with(prefix));
        before - entries.len()
    }

    /// Remove every entry carrying `tag`
    pub fn delete_tagged(&self, tag: &str) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| !e.tags.iter().any(|t| t == tag));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// Cache eviction after writes. Every record service calls one of the named
/// operations once its statement has run; there is no transaction tying the
/// two together, so a crash in between leaves entries until their TTL.
#[derive(Debug, Clone)]
pub struct CacheInvalidator {
    cache: Arc<MemoryCache>,
}

impl CacheInvalidator {
    pub fn new(cache: Arc<MemoryCache>) -> Self {
        Self { cache }
    }

    pub fn revalidate_tag(&self, tag: &str) -> usize {
        let dropped = self.cache.delete_tagged(tag);
        tracing::debug!(tag, dropped, "revalidated tag");
        dropped
    }

    pub fn revalidate_path(&self, path: &str) -> usize {
        let dropped = self.cache.delete_tagged(&keys::path_tag(path));
        tracing::debug!(path, dropped, "revalidated path");
        dropped
    }

    pub fn invalidate_blog_cache(&self, slug: Option<&str>) {
        self.cache.delete_prefix(keys::BLOG_PREFIX);
        self.cache.delete_prefix(keys::CATEGORIES_PREFIX);
        self.revalidate_tag(keys::TAG_BLOG);
        self.revalidate_path("/");
        self.revalidate_path("/blog");
        if let Some(slug) = slug {
            self.revalidate_path(&format!("/blog/{slug}"));
        }
        tracing::info!(slug = slug.unwrap_or("*"), "blog cache invalidated");
    }

    pub fn invalidate_portfolio_cache(&self, slug: Option<&str>) {
        self.cache.delete_prefix(keys::PORTFOLIO_PREFIX);
        self.cache.delete_prefix(keys::TECHNOLOGIES_PREFIX);
        self.revalidate_tag(keys::TAG_PORTFOLIO);
        self.revalidate_path("/");
        self.revalidate_path("/portfolio");
        if let Some(slug) = slug {
            self.revalidate_path(&format!("/portfolio/{slug}"));
        }
        tracing::info!(slug = slug.unwrap_or("*"), "portfolio cache invalidated");
    }

    pub fn invalidate_settings_cache(&self) {
        self.cache.delete_prefix(keys::SETTINGS_PREFIX);
        self.revalidate_tag(keys::TAG_SETTINGS);
        tracing::info!("settings cache invalidated");
    }

    pub fn invalidate_all_cache(&self) {
        self.cache.clear();
        tracing::info!("all caches cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = MemoryCache::new();
        cache.set("k", json!({"v": 1}), Duration::from_millis(100));
        assert_eq!(cache.get("k"), Some(json!({"v": 1})));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.get("k"), None);
        // expired read evicts
        assert!(cache.is_empty());
    }

    #[test]
    fn prefix_and_tag_eviction() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("blog:list:1", json!(1), ttl);
        cache.set("blog:post:hi", json!(2), ttl);
        cache.set_tagged("page", json!(3), ttl, vec!["path:/blog".to_string()]);
        cache.set("settings:all", json!(4), ttl);

        assert_eq!(cache.delete_prefix("blog:"), 2);
        assert_eq!(cache.delete_tagged("path:/blog"), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.delete("settings:all"));
        assert!(!cache.delete("settings:all"));
    }

    #[test]
    fn blog_invalidation_keeps_portfolio() {
        let cache = Arc::new(MemoryCache::new());
        let ttl = Duration::from_secs(60);
        cache.set(keys::blog_list(1, 10, None, None), json!([]), ttl);
        cache.set(keys::blog_post("hello"), json!({}), ttl);
        cache.set(keys::categories(Some("blog")), json!([]), ttl);
        cache.set(keys::portfolio_list(None, None), json!([]), ttl);
        cache.set_tagged("page:/blog/hello", json!("<html>"), ttl, vec![keys::path_tag("/blog/hello")]);

        let invalidator = CacheInvalidator::new(cache.clone());
        invalidator.invalidate_blog_cache(Some("hello"));

        assert_eq!(cache.len(), 1);
        assert!(cache.get(&keys::portfolio_list(None, None)).is_some());

        invalidator.invalidate_all_cache();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn read_through_loads_once() {
        let cache = MemoryCache::new();
        let ttl = Duration::from_secs(60);
        let first: Result<Value, ()> =
            cache.get_or_load("k", ttl, vec![keys::TAG_BLOG.to_string()], || async { Ok(json!(1)) }).await;
        assert_eq!(first, Ok(json!(1)));

        let second: Result<Value, ()> = cache.get_or_load("k", ttl, vec![], || async { Ok(json!(2)) }).await;
        assert_eq!(second, Ok(json!(1)));

        let failed: Result<Value, &str> = cache.get_or_load("other", ttl, vec![], || async { Err("boom") }).await;
        assert_eq!(failed, Err("boom"));
        assert!(cache.get("other").is_none());

        assert_eq!(cache.delete_tagged(keys::TAG_BLOG), 1);
    }

    #[test]
    fn settings_invalidation() {
        let cache = Arc::new(MemoryCache::new());
        cache.set(keys::SETTINGS_ALL, json!({"site_name": "x"}), Duration::from_secs(60));
        CacheInvalidator::new(cache.clone()).invalidate_settings_cache();
        assert!(cache.get(keys::SETTINGS_ALL).is_none());
    }
}
