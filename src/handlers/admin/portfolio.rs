// handlers/admin/portfolio.rs - /api/admin/portfolio[/:id]

use axum::extract::{Query, State};
use serde_json::Value;

use crate::database::record::Record;
use crate::handlers::public::portfolio::PortfolioListParams;
use crate::middleware::{ApiResponse, ApiResult, JsonBody, PathParam};
use crate::services::PortfolioService;
use crate::state::AppState;

/// GET /api/admin/portfolio - Every portfolio item, any status
pub async fn list(State(state): State<AppState>, Query(params): Query<PortfolioListParams>) -> ApiResult<Vec<Value>> {
    let items = PortfolioService::new(&state).list_all(&params.into_query()).await?;
    Ok(ApiResponse::success(items).key("portfolios"))
}

/// GET /api/admin/portfolio/:id
pub async fn show(State(state): State<AppState>, PathParam(id): PathParam<i64>) -> ApiResult<Value> {
    Ok(ApiResponse::success(PortfolioService::new(&state).get_by_id(id).await?))
}

/// POST /api/admin/portfolio
pub async fn create(State(state): State<AppState>, JsonBody(body): JsonBody<Value>) -> ApiResult<Value> {
    let item = PortfolioService::new(&state).create(Record::from_api_input(body)?).await?;
    Ok(ApiResponse::success(item).message("Portfolio item created"))
}

/// PUT /api/admin/portfolio/:id
pub async fn update(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Value> {
    let item = PortfolioService::new(&state).update(id, Record::from_api_input(body)?).await?;
    Ok(ApiResponse::success(item).message("Portfolio item updated"))
}

/// DELETE /api/admin/portfolio/:id
pub async fn delete(State(state): State<AppState>, PathParam(id): PathParam<i64>) -> ApiResult<()> {
    PortfolioService::new(&state).delete(id).await?;
    Ok(ApiResponse::ok_message("Portfolio item deleted"))
}
