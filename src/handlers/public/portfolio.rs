// handlers/public/portfolio.rs - GET /api/portfolio, GET /api/portfolio/:slug

use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::Value;

use super::cached;
use crate::cache::keys;
use crate::middleware::{ApiResponse, ApiResult, PathParam};
use crate::services::portfolio_service::PortfolioQuery;
use crate::services::PortfolioService;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PortfolioListParams {
    pub category: Option<String>,
    /// `true`/`1` for featured items only
    pub featured: Option<String>,
    pub status: Option<String>,
    pub limit: Option<u32>,
}

fn parse_flag(raw: Option<&str>) -> Option<bool> {
    match raw?.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

impl PortfolioListParams {
    pub fn into_query(self) -> PortfolioQuery {
        PortfolioQuery {
            featured: parse_flag(self.featured.as_deref()),
            category: self.category.filter(|c| !c.is_empty()),
            status: self.status.filter(|s| !s.is_empty()),
            limit: self.limit.filter(|l| *l > 0),
        }
    }
}

/// GET /api/portfolio - Published portfolio items
pub async fn list(State(state): State<AppState>, Query(params): Query<PortfolioListParams>) -> ApiResult<Value> {
    let query = PortfolioListParams { status: None, ..params }.into_query();
    let mut key = keys::portfolio_list(query.category.as_deref(), query.featured);
    if let Some(limit) = query.limit {
        key.push_str(&format!(":{limit}"));
    }
    let tags = [keys::TAG_PORTFOLIO.to_string(), keys::path_tag("/portfolio")];

    let service = PortfolioService::new(&state);
    let items = cached(&state, &key, state.config.cache.portfolio_ttl(), &tags, async move {
        Ok(Value::from(service.list_published(&query).await?))
    })
    .await?;
    Ok(ApiResponse::success(items).key("portfolios"))
}

/// GET /api/portfolio/:slug - One published portfolio item
pub async fn show(State(state): State<AppState>, PathParam(slug): PathParam<String>) -> ApiResult<Value> {
    let key = keys::portfolio_item(&slug);
    let tags = [keys::TAG_PORTFOLIO.to_string(), keys::path_tag(&format!("/portfolio/{slug}"))];

    let service = PortfolioService::new(&state);
    let item = cached(&state, &key, state.config.cache.portfolio_ttl(), &tags, async move {
        service.get_published_by_slug(&slug).await
    })
    .await?;
    Ok(ApiResponse::success(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn featured_flag_accepts_both_spellings() {
        assert_eq!(parse_flag(Some("1")), Some(true));
        assert_eq!(parse_flag(Some("false")), Some(false));
        assert_eq!(parse_flag(Some("yes")), None);
        assert_eq!(parse_flag(None), None);
    }
}
