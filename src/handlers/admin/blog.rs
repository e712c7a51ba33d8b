// handlers/admin/blog.rs - /api/admin/blog[/:id]

use axum::extract::{Query, State};
use serde_json::Value;

use crate::database::record::Record;
use crate::handlers::public::blog::BlogListParams;
use crate::middleware::{ApiResponse, ApiResult, AuthUser, JsonBody, PathParam};
use crate::services::BlogService;
use crate::state::AppState;

/// GET /api/admin/blog - Every post, any status
pub async fn list(State(state): State<AppState>, Query(params): Query<BlogListParams>) -> ApiResult<Vec<Value>> {
    let page = BlogService::new(&state).list_all(&params.into_query()).await?;
    Ok(ApiResponse::success(page.posts).key("posts").field("pagination", page.pagination))
}

/// GET /api/admin/blog/:id
pub async fn show(State(state): State<AppState>, PathParam(id): PathParam<i64>) -> ApiResult<Value> {
    Ok(ApiResponse::success(BlogService::new(&state).get_by_id(id).await?))
}

/// POST /api/admin/blog - Create a post authored by the caller
pub async fn create(
    State(state): State<AppState>,
    auth_user: AuthUser,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Value> {
    let input = Record::from_api_input(body)?;
    let post = BlogService::new(&state).create(input, Some(auth_user.user_id)).await?;
    Ok(ApiResponse::success(post).message("Post created"))
}

/// PUT /api/admin/blog/:id - Partial update; absent fields are left alone
pub async fn update(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Value> {
    let input = Record::from_api_input(body)?;
    let post = BlogService::new(&state).update(id, input).await?;
    Ok(ApiResponse::success(post).message("Post updated"))
}

/// DELETE /api/admin/blog/:id
pub async fn delete(State(state): State<AppState>, PathParam(id): PathParam<i64>) -> ApiResult<()> {
    BlogService::new(&state).delete(id).await?;
    Ok(ApiResponse::ok_message("Post deleted"))
}
