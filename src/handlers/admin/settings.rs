// handlers/admin/settings.rs - /api/admin/settings

use axum::extract::State;
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, JsonBody};
use crate::services::SettingsService;
use crate::state::AppState;

/// Accepts `{ "site_name": ... }` or the same object wrapped as `{ "settings": { ... } }`
fn settings_map(body: Value) -> Result<Map<String, Value>, ApiError> {
    match body {
        Value::Object(mut map) => match map.remove("settings") {
            Some(Value::Object(inner)) if map.is_empty() => Ok(inner),
            Some(other) => {
                map.insert("settings".to_string(), other);
                Ok(map)
            }
            None => Ok(map),
        },
        _ => Err(ApiError::bad_request("Expected a JSON object of settings")),
    }
}

/// GET /api/admin/settings - Current settings, bypassing the cache
pub async fn show(State(state): State<AppState>) -> ApiResult<Map<String, Value>> {
    Ok(ApiResponse::success(SettingsService::new(&state).get_all().await?))
}

/// PUT /api/admin/settings - Upsert the given keys; others are untouched
pub async fn update(State(state): State<AppState>, JsonBody(body): JsonBody<Value>) -> ApiResult<Map<String, Value>> {
    let settings = SettingsService::new(&state).update(settings_map(body)?).await?;
    Ok(ApiResponse::success(settings).message("Settings updated"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_settings_envelope() {
        let flat = settings_map(json!({ "site_name": "Studio" })).unwrap();
        assert_eq!(flat.get("site_name"), Some(&json!("Studio")));

        let wrapped = settings_map(json!({ "settings": { "phone": "555" } })).unwrap();
        assert_eq!(wrapped.get("phone"), Some(&json!("555")));

        // a setting literally named `settings` next to other keys is kept as-is
        let mixed = settings_map(json!({ "settings": "x", "a": 1 })).unwrap();
        assert_eq!(mixed.len(), 2);

        assert!(settings_map(json!([1, 2])).is_err());
    }
}
