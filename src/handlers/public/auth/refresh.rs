// handlers/public/auth/refresh.rs - POST /api/auth/refresh

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    response::{AppendHeaders, IntoResponse},
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::cookies::{build_cookie, read_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::auth::{generate_jwt, validate_jwt, AuthError, Claims, TokenType};
use crate::error::ApiError;
use crate::middleware::ApiResponse;
use crate::services::UserService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken", alias = "refresh_token")]
    pub refresh_token: Option<String>,
}

/// `refresh_token` cookie first, then the JSON body
fn refresh_token(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    if let Some(token) = read_cookie(headers, REFRESH_COOKIE) {
        return Some(token);
    }
    serde_json::from_slice::<RefreshRequest>(body)
        .ok()?
        .refresh_token
        .filter(|t| !t.is_empty())
}

/// POST /api/auth/refresh - New access token from a refresh token
///
/// The refresh token itself is not rotated; it keeps its original expiry.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let token = refresh_token(&headers, &body).ok_or(AuthError::MissingToken)?;
    let auth = &state.config.auth;
    let claims = validate_jwt(&token, TokenType::Refresh, auth)?;

    // Role changes and deletions since login take effect here
    let user = UserService::new(state.pool.clone())
        .find_by_id(claims.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;

    let access = Claims::new(user.id, &user.email, &user.role, TokenType::Access, auth);
    let access_token = generate_jwt(&access, auth)?;
    let expires_in = auth.access_token_minutes * 60;
    tracing::debug!(user_id = user.id, "Access token refreshed");

    Ok((
        AppendHeaders([(header::SET_COOKIE, build_cookie(ACCESS_COOKIE, &access_token, expires_in, auth))]),
        ApiResponse::success(json!({ "token": access_token, "expiresIn": expires_in })),
    ))
}
