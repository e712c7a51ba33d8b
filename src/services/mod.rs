//! Record services: CRUD over the content tables, assembled around whatever
//! columns the connected database actually has.

use serde_json::{json, Value};
use sqlx::mysql::MySqlPool;

use crate::auth::AuthError;
use crate::database::assembler::{Coerce, WriteSet};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::query_builder::SqlResult;
use crate::database::record::{Record, RecordError};
use crate::database::slug::{slugify, unique_slug};

pub mod blog_service;
pub mod category_service;
pub mod portfolio_service;
pub mod settings_service;
pub mod technology_service;
pub mod user_service;

pub use blog_service::BlogService;
pub use category_service::CategoryService;
pub use portfolio_service::PortfolioService;
pub use settings_service::SettingsService;
pub use technology_service::TechnologyService;
pub use user_service::{User, UserService};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    NotFound(String),
    /// Request is well-formed but violates a rule (e.g. category still in use)
    #[error("{0}")]
    Invalid(String),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(DatabaseError::Sqlx(err))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Page/limit pair for list endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    pub const DEFAULT_LIMIT: u32 = 10;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(Self::DEFAULT_LIMIT).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn to_json(&self, total: i64) -> Value {
        let limit = i64::from(self.limit);
        json!({
            "page": self.page,
            "limit": self.limit,
            "total": total,
            "totalPages": (total + limit - 1) / limit,
        })
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Current time in the format MySQL DATETIME columns accept
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Accepts RFC 3339 (`2024-05-01T09:30:00Z`) and passes anything else through
pub(crate) fn normalize_timestamp(input: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(input) {
        Ok(ts) => ts.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string(),
        Err(_) => input.to_string(),
    }
}

/// Queue every listed field the input carries; an explicit `null` clears it
pub(crate) fn copy_fields(write: &mut WriteSet<'_>, input: &Record, fields: &[(&str, Coerce)]) {
    for (field, how) in fields {
        if input.contains(field) {
            let value = input.get(field).cloned().unwrap_or(Value::Null);
            write.set_coerced(field, value, *how);
        }
    }
}

/// Normalized `category_id` first, then the legacy free-text `category`
pub(crate) fn category_candidates(input: &Record) -> Vec<(&'static str, Value)> {
    let mut candidates = Vec::new();
    if input.contains("category_id") {
        let id = input.get_i64("category_id").map(Value::from).unwrap_or(Value::Null);
        candidates.push(("category_id", id));
    }
    if let Some(name) = input.get_text("category") {
        candidates.push(("category", Value::from(name)));
    }
    candidates
}

pub(crate) fn read_status(input: &Record, allowed: &[&str]) -> Result<Option<String>, RecordError> {
    match input.get_text("status") {
        None => Ok(None),
        Some(status) if allowed.contains(&status) => Ok(Some(status.to_string())),
        Some(status) => Err(RecordError::InvalidField {
            field: "status".to_string(),
            reason: format!("'{}' is not one of {}", status, allowed.join(", ")),
        }),
    }
}

pub(crate) async fn slug_taken(
    pool: &MySqlPool,
    table: &str,
    slug: &str,
    exclude_id: Option<i64>,
) -> Result<bool, DatabaseError> {
    let mut query = format!(
        "SELECT COUNT(*) FROM {} WHERE `slug` = ?",
        DatabaseManager::quote_identifier(table)
    );
    let mut params = vec![Value::from(slug)];
    if let Some(id) = exclude_id {
        query.push_str(" AND `id` <> ?");
        params.push(Value::from(id));
    }
    Ok(SqlResult::new(query, params).fetch_count(pool).await? > 0)
}

/// Slug for a row: the requested one (normalized) or one derived from
/// `source`, suffixed until no other row in `table` uses it.
pub(crate) async fn resolve_slug(
    pool: &MySqlPool,
    table: &str,
    requested: Option<&str>,
    source: &str,
    exclude_id: Option<i64>,
) -> ServiceResult<String> {
    let base = slugify(requested.unwrap_or(source));
    if base.is_empty() {
        return Err(RecordError::InvalidField {
            field: "slug".to_string(),
            reason: "must contain at least one letter or digit".to_string(),
        }
        .into());
    }

    let slug = unique_slug(&base, |candidate| {
        let pool = pool.clone();
        async move { slug_taken(&pool, table, &candidate, exclude_id).await }
    })
    .await?;

    if slug != base {
        tracing::debug!(table, base = %base, slug = %slug, "slug taken, using suffix");
    }
    Ok(slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::ColumnMap;

    fn input(value: Value) -> Record {
        Record::from_api_input(value).unwrap()
    }

    #[test]
    fn category_prefers_normalized_id() {
        let candidates = category_candidates(&input(json!({ "category_id": "4", "category": "News" })));
        assert_eq!(candidates, vec![("category_id", json!(4)), ("category", json!("News"))]);

        let legacy_only = category_candidates(&input(json!({ "category": " Design " })));
        assert_eq!(legacy_only, vec![("category", json!("Design"))]);
    }

    #[test]
    fn status_must_be_known() {
        let allowed = &["draft", "published"];
        assert_eq!(read_status(&input(json!({})), allowed).unwrap(), None);
        assert_eq!(
            read_status(&input(json!({ "status": "published" })), allowed).unwrap().as_deref(),
            Some("published")
        );
        assert!(read_status(&input(json!({ "status": "live" })), allowed).is_err());
    }

    #[test]
    fn copies_only_supplied_fields() {
        let map = ColumnMap::new("posts", [("excerpt", true), ("tags", true), ("featured", true)]);
        let mut write = WriteSet::new(&map);
        copy_fields(
            &mut write,
            &input(json!({ "tags": ["a", "b"], "excerpt": null })),
            &[("excerpt", Coerce::Plain), ("tags", Coerce::CommaList), ("featured", Coerce::Flag)],
        );
        assert_eq!(write.columns(), ["excerpt".to_string(), "tags".to_string()]);
        assert_eq!(write.values(), [Value::Null, json!("a, b")]);
    }

    #[test]
    fn normalizes_iso_timestamps() {
        assert_eq!(normalize_timestamp("2024-05-01T09:30:00Z"), "2024-05-01 09:30:00");
        assert_eq!(normalize_timestamp("2024-05-01T11:30:00+02:00"), "2024-05-01 09:30:00");
        assert_eq!(normalize_timestamp("2024-05-01 09:30:00"), "2024-05-01 09:30:00");
    }

    #[test]
    fn pagination_defaults_and_bounds() {
        let p = Pagination::new(None, None);
        assert_eq!((p.page, p.limit, p.offset()), (1, 10, 0));

        let p = Pagination::new(Some(0), Some(1000));
        assert_eq!((p.page, p.limit), (1, 100));

        let p = Pagination::new(Some(3), Some(20));
        assert_eq!(p.offset(), 40);
        assert_eq!(p.to_json(41)["totalPages"], json!(3));
        assert_eq!(p.to_json(0)["totalPages"], json!(0));
    }

    #[test]
    fn timestamp_is_mysql_datetime() {
        let ts = now_timestamp();
        assert_eq!(ts.len(), 19);
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, "%Y-%m-%d %H:%M:%S").is_ok());
    }
}
