// handlers/public/auth/me.rs - GET /api/auth/me

use axum::extract::State;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{User, UserService};
use crate::state::AppState;

/// GET /api/auth/me - The account behind the access token
pub async fn me(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<User> {
    let user = UserService::new(state.pool.clone())
        .find_by_id(auth_user.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("User no longer exists"))?;
    Ok(ApiResponse::success(user))
}
