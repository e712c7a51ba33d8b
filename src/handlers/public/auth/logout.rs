// handlers/public/auth/logout.rs - POST /api/auth/logout

use axum::{
    extract::State,
    http::header,
    response::{AppendHeaders, IntoResponse},
};

use crate::auth::cookies::{clear_cookie, ACCESS_COOKIE, REFRESH_COOKIE};
use crate::middleware::ApiResponse;
use crate::state::AppState;

/// POST /api/auth/logout - Expire both auth cookies
///
/// Tokens are stateless, so an already-copied token stays valid until it expires.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let auth = &state.config.auth;
    (
        AppendHeaders([
            (header::SET_COOKIE, clear_cookie(ACCESS_COOKIE, auth)),
            (header::SET_COOKIE, clear_cookie(REFRESH_COOKIE, auth)),
        ]),
        ApiResponse::ok_message("Logged out"),
    )
}
