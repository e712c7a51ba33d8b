// handlers/public/auth/login.rs - POST /api/auth/login

use axum::{
    extract::State,
    http::header,
    response::{AppendHeaders, IntoResponse},
};
use serde::Deserialize;
use serde_json::json;

use crate::auth::cookies::{build_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::auth::issue_token_pair;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, JsonBody};
use crate::services::UserService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Both credentials, or a 400
    fn credentials(&self) -> Result<(&str, &str), ApiError> {
        let email = self.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
        let password = self.password.as_deref().filter(|p| !p.is_empty());
        match (email, password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(ApiError::bad_request("Email and password are required")),
        }
    }
}

/**
 * POST /api/auth/login - Exchange credentials for tokens
 *
 * Input: `{ "email": "...", "password": "..." }`
 *
 * On success both tokens are set as httpOnly cookies and also returned in the
 * body for non-browser clients. A wrong password and an unknown email produce
 * the same 401, with no cookies.
 */
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (email, password) = body.credentials()?;

    let users = UserService::new(state.pool.clone());
    let Some(user) = users.authenticate(email, password).await? else {
        tracing::warn!(email = %email, "Failed login attempt");
        return Err(ApiError::unauthorized("Invalid email or password"));
    };

    let auth = &state.config.auth;
    let tokens = issue_token_pair(user.id, &user.email, &user.role, auth)?;
    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    let cookies = AppendHeaders([
        (header::SET_COOKIE, build_cookie(ACCESS_COOKIE, &tokens.access_token, tokens.expires_in, auth)),
        (
            header::SET_COOKIE,
            build_cookie(REFRESH_COOKIE, &tokens.refresh_token, tokens.refresh_expires_in, auth),
        ),
    ]);
    let body = ApiResponse::success(json!({
        "user": user,
        "token": tokens.access_token,
        "refreshToken": tokens.refresh_token,
        "expiresIn": tokens.expires_in,
    }))
    .message("Login successful");

    Ok((cookies, body))
}
