// handlers/public/blog.rs - GET /api/blog, GET /api/blog/:slug

use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{cached, take_field};
use crate::cache::keys;
use crate::middleware::{ApiResponse, ApiResult, PathParam};
use crate::services::blog_service::PostQuery;
use crate::services::{BlogService, Pagination};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BlogListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Category slug
    pub category: Option<String>,
    pub search: Option<String>,
    /// Admin listings only
    pub status: Option<String>,
}

impl BlogListParams {
    pub fn into_query(self) -> PostQuery {
        PostQuery {
            category: self.category.filter(|c| !c.is_empty()),
            search: self.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            status: self.status.filter(|s| !s.is_empty()),
            pagination: Pagination::new(self.page, self.limit),
        }
    }
}

/// GET /api/blog - Published posts, paginated
pub async fn list(State(state): State<AppState>, Query(params): Query<BlogListParams>) -> ApiResult<Value> {
    let query = BlogListParams { status: None, ..params }.into_query();
    let key = keys::blog_list(
        query.pagination.page,
        query.pagination.limit,
        query.category.as_deref(),
        query.search.as_deref(),
    );
    let tags = [keys::TAG_BLOG.to_string(), keys::path_tag("/blog")];

    let service = BlogService::new(&state);
    let mut page = cached(&state, &key, state.config.cache.blog_ttl(), &tags, async move {
        let page = service.list_published(&query).await?;
        Ok(json!({ "posts": page.posts, "pagination": page.pagination }))
    })
    .await?;

    let pagination = take_field(&mut page, "pagination");
    Ok(ApiResponse::success(take_field(&mut page, "posts"))
        .key("posts")
        .field("pagination", pagination))
}

/// GET /api/blog/:slug - One published post
pub async fn show(State(state): State<AppState>, PathParam(slug): PathParam<String>) -> ApiResult<Value> {
    let key = keys::blog_post(&slug);
    let tags = [keys::TAG_BLOG.to_string(), keys::path_tag(&format!("/blog/{slug}"))];

    let service = BlogService::new(&state);
    let post = cached(&state, &key, state.config.cache.blog_ttl(), &tags, async move {
        service.get_published_by_slug(&slug).await
    })
    .await?;
    Ok(ApiResponse::success(post))
}
