// handlers/public/site.rs - GET /, GET /health

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::database::manager::DatabaseManager;
use crate::state::AppState;

/// GET / - Service description and endpoint index
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Studio CMS API",
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "blog": "/api/blog[/:slug] (public)",
                "portfolio": "/api/portfolio[/:slug] (public)",
                "catalog": "/api/categories, /api/portfolio-categories, /api/technologies (public)",
                "settings": "/api/settings (public)",
                "auth": "/api/auth/login, /api/auth/logout, /api/auth/refresh, /api/auth/me",
                "revalidate": "/api/revalidate (bearer secret)",
                "admin": "/api/admin/* (admin or editor token)",
                "uploads": "/uploads/* (static)",
            }
        }
    }))
}

/// GET /health - Liveness plus a database round trip
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok",
                    "cache_entries": state.cache.len(),
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "message": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string(),
                    }
                })),
            )
        }
    }
}
