// handlers/admin/cache.rs - POST /api/admin/cache/clear

use axum::extract::State;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;

/// POST /api/admin/cache/clear - Drop every cached read
pub async fn clear(State(state): State<AppState>, auth_user: AuthUser) -> ApiResult<Value> {
    let cleared = state.cache.len();
    state.invalidator().invalidate_all_cache();
    tracing::info!(user_id = auth_user.user_id, cleared, "Cache cleared from admin");
    Ok(ApiResponse::success(json!({ "cleared": cleared })).message("Cache cleared"))
}
