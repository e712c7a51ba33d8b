#![allow(dead_code)]

use anyhow::Result;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;
use tower::ServiceExt;

use studio_cms::app::app;
use studio_cms::auth::{issue_token_pair, TokenPair};
use studio_cms::config::AppConfig;
use studio_cms::database::DatabaseManager;
use studio_cms::state::AppState;

pub const REVALIDATE_SECRET: &str = "test-revalidate-secret";

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.auth.jwt_secret = "integration-test-secret".to_string();
    config.cache.revalidate_secret = REVALIDATE_SECRET.to_string();
    config.upload.dir = std::env::temp_dir()
        .join(format!("studio-cms-test-{}", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned();
    config
}

/// Router over a pool that never connects; for requests that must be
/// answered before any query runs
pub fn offline_app() -> Result<(Router, AppState)> {
    let config = test_config();
    let pool = MySqlPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("mysql://nobody@127.0.0.1:9/unreachable")?;
    let state = AppState::new(pool, config);
    Ok((app(state.clone()), state))
}

/// Router over `TEST_DATABASE_URL` with migrations applied, or `None` when
/// the variable is unset
pub async fn live_app() -> Result<Option<(Router, AppState)>> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping live database test");
        return Ok(None);
    };
    let mut config = test_config();
    config.database.url = Some(url);

    let pool = DatabaseManager::connect(&config).await?;
    DatabaseManager::run_migrations(&pool).await?;
    let state = AppState::new(pool, config);
    Ok(Some((app(state.clone()), state)))
}

pub fn tokens(state: &AppState, user_id: i64, role: &str) -> Result<TokenPair> {
    Ok(issue_token_pair(user_id, "tester@example.com", role, &state.config.auth)?)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> Result<TestResponse> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    Ok(TestResponse { status, headers, body })
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder.body(Body::from(serde_json::to_vec(body)?))?)
}

pub fn get_request(uri: &str, token: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder.body(Body::empty())?)
}

/// Single-file multipart body under field `file`
pub fn multipart_request(uri: &str, token: &str, file_name: &str, mime: &str, data: &[u8]) -> Result<Request<Body>> {
    let boundary = "studio-cms-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Ok(Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))?)
}
