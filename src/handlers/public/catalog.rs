// handlers/public/catalog.rs - Category and technology listings
//
// GET /api/categories, GET /api/portfolio-categories, GET /api/technologies

use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::Value;

use super::cached;
use crate::cache::keys;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{CategoryService, TechnologyService};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CategoryParams {
    /// `blog` or `portfolio`
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TechnologyParams {
    pub category: Option<String>,
}

/// GET /api/categories - Categories with published post counts
pub async fn categories(State(state): State<AppState>, Query(params): Query<CategoryParams>) -> ApiResult<Value> {
    let kind = params.kind.filter(|k| !k.is_empty());
    let key = keys::categories(kind.as_deref());
    let tags = [keys::TAG_BLOG.to_string()];

    let service = CategoryService::new(&state);
    let categories = cached(&state, &key, state.config.cache.catalog_ttl(), &tags, async move {
        Ok(Value::from(service.list(kind.as_deref()).await?))
    })
    .await?;
    Ok(ApiResponse::success(categories))
}

/// GET /api/portfolio-categories - Portfolio categories (or project types)
pub async fn portfolio_categories(State(state): State<AppState>) -> ApiResult<Value> {
    let tags = [keys::TAG_PORTFOLIO.to_string()];

    let service = CategoryService::new(&state);
    let categories = cached(
        &state,
        keys::PORTFOLIO_CATEGORIES,
        state.config.cache.catalog_ttl(),
        &tags,
        async move { Ok(Value::from(service.list_portfolio_categories().await?)) },
    )
    .await?;
    Ok(ApiResponse::success(categories))
}

/// GET /api/technologies - Technologies, optionally for one grouping
pub async fn technologies(State(state): State<AppState>, Query(params): Query<TechnologyParams>) -> ApiResult<Value> {
    let category = params.category.filter(|c| !c.is_empty());
    let key = keys::technologies(category.as_deref());
    let tags = [keys::TAG_PORTFOLIO.to_string()];

    let service = TechnologyService::new(&state);
    let technologies = cached(&state, &key, state.config.cache.catalog_ttl(), &tags, async move {
        Ok(Value::from(service.list(category.as_deref()).await?))
    })
    .await?;
    Ok(ApiResponse::success(technologies))
}
