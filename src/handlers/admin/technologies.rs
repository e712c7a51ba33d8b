// handlers/admin/technologies.rs - /api/admin/technologies[/:id]

use axum::extract::{Query, State};
use serde_json::Value;

use crate::database::record::Record;
use crate::handlers::public::catalog::TechnologyParams;
use crate::middleware::{ApiResponse, ApiResult, JsonBody, PathParam};
use crate::services::TechnologyService;
use crate::state::AppState;

pub async fn list(State(state): State<AppState>, Query(params): Query<TechnologyParams>) -> ApiResult<Vec<Value>> {
    let category = params.category.filter(|c| !c.is_empty());
    Ok(ApiResponse::success(TechnologyService::new(&state).list(category.as_deref()).await?))
}

pub async fn show(State(state): State<AppState>, PathParam(id): PathParam<i64>) -> ApiResult<Value> {
    Ok(ApiResponse::success(TechnologyService::new(&state).get_by_id(id).await?))
}

pub async fn create(State(state): State<AppState>, JsonBody(body): JsonBody<Value>) -> ApiResult<Value> {
    let technology = TechnologyService::new(&state).create(Record::from_api_input(body)?).await?;
    Ok(ApiResponse::success(technology).message("Technology created"))
}

pub async fn update(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Value> {
    let technology = TechnologyService::new(&state).update(id, Record::from_api_input(body)?).await?;
    Ok(ApiResponse::success(technology).message("Technology updated"))
}

pub async fn delete(State(state): State<AppState>, PathParam(id): PathParam<i64>) -> ApiResult<()> {
    TechnologyService::new(&state).delete(id).await?;
    Ok(ApiResponse::ok_message("Technology deleted"))
}
