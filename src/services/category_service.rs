use serde_json::Value;
use sqlx::mysql::MySqlPool;
use tracing::{debug, info};

use super::portfolio_service::find_category_table;
use super::{resolve_slug, ServiceError, ServiceResult};
use crate::cache::CacheInvalidator;
use crate::database::assembler::{Fallback, FieldSpec, Projection, WhereClause, WriteSet};
use crate::database::manager::DatabaseManager;
use crate::database::record::{Record, RecordError};
use crate::database::schema::{ColumnMap, SchemaProbe, SchemaProber};
use crate::database::SqlResult;
use crate::state::AppState;

const TABLE: &str = "categories";

pub const KINDS: &[&str] = &["blog", "portfolio"];

const WRITE_COLUMNS: &[&str] = &["name", "slug", "description", "type", "color"];

/// Post columns the delete rule and post counts depend on
const POST_COLUMNS: &[&str] = &["category_id", "status"];

fn post_count_expr(posts: &ColumnMap) -> Option<String> {
    if !posts.has("category_id") {
        return None;
    }
    let published = if posts.has("status") { " AND `pp`.`status` = 'published'" } else { "" };
    Some(format!(
        "(SELECT COUNT(*) FROM `posts` `pp` WHERE `pp`.`category_id` = `c`.`id`{published})"
    ))
}

fn projection(posts: &ColumnMap) -> Projection {
    let post_count = match post_count_expr(posts) {
        Some(expr) => Fallback::Expr(expr),
        None => Fallback::Zero,
    };

    Projection::qualified("c")
        .field("id")
        .field("name")
        .with(FieldSpec::new("slug").column("slug").fallback(Fallback::slug_from("`c`.`name`")))
        .field_or("description", Fallback::EmptyString)
        .field_or("type", Fallback::Expr("'blog'".to_string()))
        .field("color")
        .field("created_at")
        .with(FieldSpec::new("post_count").fallback(post_count))
}

/// Archived and status-less posts block a delete just like published ones
fn in_use(count: i64) -> ServiceError {
    ServiceError::Invalid(format!("Cannot delete category: it is used by {count} non-draft post(s)"))
}

fn read_kind(value: Option<&str>) -> Result<Option<&str>, RecordError> {
    match value {
        None => Ok(None),
        Some(kind) if KINDS.contains(&kind) => Ok(Some(kind)),
        Some(kind) => Err(RecordError::InvalidField {
            field: "type".to_string(),
            reason: format!("'{}' is not one of {}", kind, KINDS.join(", ")),
        }),
    }
}

fn prepare_write<'m>(columns: &'m ColumnMap, input: &Record) -> Result<WriteSet<'m>, RecordError> {
    let mut write = WriteSet::new(columns);
    if input.contains("name") {
        write.set("name", input.require_text("name")?);
    }
    for field in ["description", "color"] {
        if input.contains(field) {
            write.set(field, input.get(field).cloned().unwrap_or(Value::Null));
        }
    }
    if let Some(kind) = read_kind(input.get_text("type"))? {
        write.set("type", kind);
    }
    Ok(write)
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Category not found".to_string())
}

pub struct CategoryService {
    pool: MySqlPool,
    prober: SchemaProber,
    invalidator: CacheInvalidator,
}

impl CategoryService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            prober: SchemaProber::new(state.pool.clone()),
            invalidator: state.invalidator(),
        }
    }

    async fn read_shape(&self) -> ServiceResult<(ColumnMap, Projection)> {
        let posts = self.prober.detect_columns("posts", POST_COLUMNS).await?;
        let projection = projection(&posts);
        let columns = self.prober.detect_columns(TABLE, &projection.columns()).await?;
        Ok((columns, projection))
    }

    /// Blog/portfolio categories with their published post counts
    pub async fn list(&self, kind: Option<&str>) -> ServiceResult<Vec<Value>> {
        let kind = read_kind(kind.filter(|k| !k.is_empty()))?;
        let (columns, projection) = self.read_shape().await?;

        let mut filter = WhereClause::new();
        if let Some(kind) = kind.filter(|_| columns.has("type")) {
            filter.and("`c`.`type` = ?", [Value::from(kind)]);
        }
        let order = if columns.has("name") { "`c`.`name` ASC" } else { "`c`.`id` ASC" };

        let rows = SqlResult::new(
            format!(
                "SELECT {} FROM `categories` `c` WHERE {} ORDER BY {}",
                projection.to_sql(&columns),
                filter.to_sql(),
                order
            ),
            filter.params().to_vec(),
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Record::into_json).collect())
    }

    async fn find_record(&self, id: i64) -> ServiceResult<Option<Record>> {
        let (columns, projection) = self.read_shape().await?;
        let sql = SqlResult::new(
            format!("SELECT {} FROM `categories` `c` WHERE `c`.`id` = ? LIMIT 1", projection.to_sql(&columns)),
            vec![Value::from(id)],
        );
        Ok(sql.fetch_optional(&self.pool).await?)
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Value> {
        self.find_record(id).await?.map(Record::into_json).ok_or_else(not_found)
    }

    pub async fn create(&self, input: Record) -> ServiceResult<Value> {
        let name = input.require_text("name")?.to_string();
        let columns = self.prober.detect_columns(TABLE, WRITE_COLUMNS).await?;
        let mut write = prepare_write(&columns, &input)?;
        if input.get_text("type").is_none() {
            write.set("type", "blog");
        }
        if columns.has("slug") {
            let slug = resolve_slug(&self.pool, TABLE, input.get_text("slug"), &name, None).await?;
            write.set("slug", slug);
        }

        let result = write.insert_sql().execute(&self.pool).await?;
        let id = result.last_insert_id() as i64;
        info!(table = TABLE, id, name = %name, "Created category");

        self.invalidate();
        self.get_by_id(id).await
    }

    pub async fn update(&self, id: i64, input: Record) -> ServiceResult<Value> {
        self.find_record(id).await?.ok_or_else(not_found)?;
        let columns = self.prober.detect_columns(TABLE, WRITE_COLUMNS).await?;
        let mut write = prepare_write(&columns, &input)?;
        if let Some(requested) = input.get_text("slug").filter(|_| columns.has("slug")) {
            let slug = resolve_slug(&self.pool, TABLE, Some(requested), requested, Some(id)).await?;
            write.set("slug", slug);
        }

        match write.update_sql("id", id) {
            Some(sql) => {
                sql.execute(&self.pool).await?;
                info!(table = TABLE, id, "Updated category");
                self.invalidate();
            }
            None => debug!(table = TABLE, id, "No writable columns in update"),
        }
        self.get_by_id(id).await
    }

    /// Refuses while any non-draft post uses the category. Otherwise the
    /// draft posts go first, then the category; the two deletes are separate
    /// statements with no transaction around them.
    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        self.find_record(id).await?.ok_or_else(not_found)?;
        let posts = self.prober.detect_columns("posts", POST_COLUMNS).await?;

        if posts.has("category_id") {
            let in_use_sql = if posts.has("status") {
                "SELECT COUNT(*) FROM `posts` WHERE `category_id` = ? AND (`status` IS NULL OR `status` <> 'draft')"
            } else {
                "SELECT COUNT(*) FROM `posts` WHERE `category_id` = ?"
            };
            let count = SqlResult::new(in_use_sql, vec![Value::from(id)]).fetch_count(&self.pool).await?;
            if count > 0 {
                return Err(in_use(count));
            }

            if posts.has("status") {
                let drafts = SqlResult::new(
                    "DELETE FROM `posts` WHERE `category_id` = ? AND `status` = 'draft'",
                    vec![Value::from(id)],
                )
                .execute(&self.pool)
                .await?;
                if drafts.rows_affected() > 0 {
                    info!(table = "posts", category_id = id, deleted = drafts.rows_affected(), "Deleted draft posts of category");
                }
            }
        }

        SqlResult::new("DELETE FROM `categories` WHERE `id` = ?", vec![Value::from(id)])
            .execute(&self.pool)
            .await?;
        info!(table = TABLE, id, "Deleted category");

        self.invalidate();
        Ok(())
    }

    /// Categories of the portfolio, from whichever category table exists
    pub async fn list_portfolio_categories(&self) -> ServiceResult<Vec<Value>> {
        let Some(table) = find_category_table(&self.prober).await? else {
            return Ok(Vec::new());
        };

        let projection = Projection::new()
            .field("id")
            .field("name")
            .with(FieldSpec::new("slug").column("slug").fallback(Fallback::slug_from("`name`")))
            .field_or("description", Fallback::EmptyString)
            .field_or("sort_order", Fallback::Zero);
        let columns = self.prober.detect_columns(table.name, &projection.columns()).await?;
        let order = if columns.has("sort_order") { "`sort_order` ASC, `name` ASC" } else { "`name` ASC" };

        let rows = SqlResult::new(
            format!(
                "SELECT {} FROM {} ORDER BY {}",
                projection.to_sql(&columns),
                DatabaseManager::quote_identifier(table.name),
                order
            ),
            vec![],
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Record::into_json).collect())
    }

    fn invalidate(&self) {
        self.invalidator.invalidate_blog_cache(None);
        self.invalidator.invalidate_portfolio_cache(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn posts(present: &[&str]) -> ColumnMap {
        ColumnMap::new("posts", POST_COLUMNS.iter().map(|c| (*c, present.contains(c))))
    }

    #[test]
    fn in_use_message_counts_every_non_draft_post() {
        let err = in_use(2);
        assert!(matches!(&err, ServiceError::Invalid(_)));
        assert_eq!(err.to_string(), "Cannot delete category: it is used by 2 non-draft post(s)");
    }

    #[test]
    fn post_counts_only_when_posts_reference_categories() {
        let categories = ColumnMap::new(TABLE, [("id", true), ("name", true), ("slug", false), ("type", true)]);

        let sql = projection(&posts(&["category_id", "status"])).to_sql(&categories);
        assert!(sql.contains(
            "(SELECT COUNT(*) FROM `posts` `pp` WHERE `pp`.`category_id` = `c`.`id` AND `pp`.`status` = 'published') AS `post_count`"
        ));
        assert!(sql.contains("TRIM(BOTH '-' FROM REGEXP_REPLACE(LOWER(`c`.`name`), '[^a-z0-9]+', '-')) AS `slug`"));

        let sql = projection(&posts(&[])).to_sql(&categories);
        assert!(sql.contains("0 AS `post_count`"));
    }

    #[test]
    fn kind_must_be_blog_or_portfolio() {
        assert_eq!(read_kind(Some("portfolio")).unwrap(), Some("portfolio"));
        assert_eq!(read_kind(None).unwrap(), None);
        assert!(read_kind(Some("news")).is_err());
    }

    #[test]
    fn write_requires_name_when_given() {
        let columns = ColumnMap::new(TABLE, WRITE_COLUMNS.iter().map(|c| (*c, *c != "color")));
        let input = Record::from_api_input(json!({ "name": "Design", "color": "#fff", "type": "portfolio" })).unwrap();
        let write = prepare_write(&columns, &input).unwrap();
        assert_eq!(write.columns(), ["name".to_string(), "type".to_string()]);

        let blank = Record::from_api_input(json!({ "name": "" })).unwrap();
        assert!(prepare_write(&columns, &blank).is_err());
    }
}
