// handlers/admin/categories.rs - /api/admin/categories[/:id]

use axum::extract::{Query, State};
use serde_json::Value;

use crate::database::record::Record;
use crate::handlers::public::catalog::CategoryParams;
use crate::middleware::{ApiResponse, ApiResult, JsonBody, PathParam};
use crate::services::CategoryService;
use crate::state::AppState;

/// GET /api/admin/categories - Uncached listing for the editor
pub async fn list(State(state): State<AppState>, Query(params): Query<CategoryParams>) -> ApiResult<Vec<Value>> {
    let kind = params.kind.filter(|k| !k.is_empty());
    Ok(ApiResponse::success(CategoryService::new(&state).list(kind.as_deref()).await?))
}

/// GET /api/admin/categories/:id
pub async fn show(State(state): State<AppState>, PathParam(id): PathParam<i64>) -> ApiResult<Value> {
    Ok(ApiResponse::success(CategoryService::new(&state).get_by_id(id).await?))
}

/// POST /api/admin/categories
pub async fn create(State(state): State<AppState>, JsonBody(body): JsonBody<Value>) -> ApiResult<Value> {
    let category = CategoryService::new(&state).create(Record::from_api_input(body)?).await?;
    Ok(ApiResponse::success(category).message("Category created"))
}

/// PUT /api/admin/categories/:id
pub async fn update(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Value> {
    let category = CategoryService::new(&state).update(id, Record::from_api_input(body)?).await?;
    Ok(ApiResponse::success(category).message("Category updated"))
}

/// DELETE /api/admin/categories/:id - Refused (400) while published posts use it;
/// draft posts in the category are deleted along with it
pub async fn delete(State(state): State<AppState>, PathParam(id): PathParam<i64>) -> ApiResult<()> {
    CategoryService::new(&state).delete(id).await?;
    Ok(ApiResponse::ok_message("Category deleted"))
}
