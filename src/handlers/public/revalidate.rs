// handlers/public/revalidate.rs - POST /api/revalidate
//
// Webhook for external systems (deploy hooks, the admin UI) to drop cached
// reads. Guarded by a shared bearer secret; without a configured secret every
// call is rejected.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::cache::CacheInvalidator;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RevalidateRequest {
    /// `blog`, `portfolio`, `settings`, `tag`, `path` or `all`
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub slug: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub path: Option<String>,
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

fn check_secret(headers: &HeaderMap, secret: &str) -> Result<(), ApiError> {
    if secret.is_empty() {
        tracing::warn!("Revalidation requested but no secret is configured");
        return Err(ApiError::unauthorized("Revalidation is not configured"));
    }
    match bearer(headers) {
        Some(token) if token == secret => Ok(()),
        _ => Err(ApiError::unauthorized("Invalid revalidation secret")),
    }
}

/// Run the requested invalidation; returns a short description of what was dropped
pub fn apply(invalidator: &CacheInvalidator, request: &RevalidateRequest) -> Result<String, ApiError> {
    let slug = request.slug.as_deref().filter(|s| !s.is_empty());
    match request.kind.as_deref() {
        Some("blog") => {
            invalidator.invalidate_blog_cache(slug);
            Ok("blog".to_string())
        }
        Some("portfolio") => {
            invalidator.invalidate_portfolio_cache(slug);
            Ok("portfolio".to_string())
        }
        Some("settings") => {
            invalidator.invalidate_settings_cache();
            Ok("settings".to_string())
        }
        Some("tag") => {
            if request.tags.is_empty() {
                return Err(ApiError::bad_request("tags are required for type tag"));
            }
            for tag in &request.tags {
                invalidator.revalidate_tag(tag);
            }
            Ok(format!("tags {}", request.tags.join(", ")))
        }
        Some("path") => {
            let path = request
                .path
                .as_deref()
                .filter(|p| p.starts_with('/'))
                .ok_or_else(|| ApiError::bad_request("path is required for type path"))?;
            invalidator.revalidate_path(path);
            Ok(format!("path {path}"))
        }
        Some("all") => {
            invalidator.invalidate_all_cache();
            Ok("all".to_string())
        }
        Some(other) => Err(ApiError::bad_request(format!("Unknown revalidation type: {other}"))),
        None => Err(ApiError::bad_request("type is required")),
    }
}

/// POST /api/revalidate - Invalidate cached content by type, tag or path
pub async fn revalidate(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult<Value> {
    // Secret first, so unauthenticated callers learn nothing about the body format
    check_secret(&headers, &state.config.cache.revalidate_secret)?;

    let request: RevalidateRequest =
        serde_json::from_slice(&body).map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;
    let what = apply(&state.invalidator(), &request)?;
    tracing::info!(revalidated = %what, "Revalidated via webhook");

    Ok(ApiResponse::success(json!({
        "revalidated": true,
        "now": chrono::Utc::now().timestamp_millis(),
    }))
    .message(format!("Revalidated {what}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{keys, MemoryCache};
    use axum::http::HeaderValue;
    use std::sync::Arc;
    use std::time::Duration;

    fn request(body: Value) -> RevalidateRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn secret_is_required_and_must_match() {
        let mut headers = HeaderMap::new();
        assert!(check_secret(&headers, "s3cret").is_err());
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer wrong"));
        assert!(check_secret(&headers, "s3cret").is_err());
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert!(check_secret(&headers, "s3cret").is_ok());
        // unset secret fails closed
        assert!(check_secret(&headers, "").is_err());
    }

    #[test]
    fn dispatches_by_type() {
        let cache = Arc::new(MemoryCache::new());
        let ttl = Duration::from_secs(60);
        cache.set(keys::blog_post("hello"), json!({}), ttl);
        cache.set_tagged("page:/about", json!("<html>"), ttl, vec![keys::path_tag("/about")]);
        cache.set(keys::SETTINGS_ALL, json!({}), ttl);
        let invalidator = CacheInvalidator::new(cache.clone());

        apply(&invalidator, &request(json!({ "type": "blog", "slug": "hello" }))).unwrap();
        assert!(cache.get(&keys::blog_post("hello")).is_none());

        apply(&invalidator, &request(json!({ "type": "path", "path": "/about" }))).unwrap();
        assert!(cache.get("page:/about").is_none());
        assert_eq!(cache.len(), 1);

        apply(&invalidator, &request(json!({ "type": "all" }))).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn rejects_incomplete_requests() {
        let invalidator = CacheInvalidator::new(Arc::new(MemoryCache::new()));
        for body in [
            json!({ "type": "tag" }),
            json!({ "type": "path" }),
            json!({ "type": "pages" }),
            json!({}),
        ] {
            let err = apply(&invalidator, &request(body)).unwrap_err();
            assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        }
    }
}
