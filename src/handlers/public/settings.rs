// handlers/public/settings.rs - GET /api/settings

use axum::extract::State;
use serde_json::Value;

use super::cached;
use crate::cache::keys;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::SettingsService;
use crate::state::AppState;

/// GET /api/settings - Every site setting as one object
pub async fn show(State(state): State<AppState>) -> ApiResult<Value> {
    let tags = [keys::TAG_SETTINGS.to_string()];

    let service = SettingsService::new(&state);
    let settings = cached(&state, keys::SETTINGS_ALL, state.config.cache.settings_ttl(), &tags, async move {
        Ok(Value::Object(service.get_all().await?))
    })
    .await?;
    Ok(ApiResponse::success(settings))
}
