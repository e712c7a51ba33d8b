use serde::Serialize;
use serde_json::Value;
use sqlx::mysql::MySqlPool;
use tracing::{debug, info};

use super::{
    category_candidates, copy_fields, normalize_timestamp, now_timestamp, read_status, resolve_slug, Pagination,
    ServiceError, ServiceResult,
};
use crate::cache::CacheInvalidator;
use crate::database::assembler::{Coerce, Fallback, FieldSpec, Projection, WhereClause, WriteSet};
use crate::database::record::{parse_list, Record, RecordError};
use crate::database::schema::{ColumnMap, SchemaProbe, SchemaProber};
use crate::database::slug::slugify;
use crate::database::SqlResult;
use crate::state::AppState;

const TABLE: &str = "posts";

pub const STATUSES: &[&str] = &["draft", "published", "archived"];

/// Every column a post write may touch
const WRITE_COLUMNS: &[&str] = &[
    "title",
    "slug",
    "excerpt",
    "content",
    "featured_image",
    "meta_title",
    "meta_description",
    "reading_time",
    "tags",
    "featured",
    "category_id",
    "category",
    "status",
    "published_at",
    "author_id",
];

const CONTENT_FIELDS: &[(&str, Coerce)] = &[
    ("excerpt", Coerce::Plain),
    ("content", Coerce::Plain),
    ("featured_image", Coerce::Plain),
    ("meta_title", Coerce::Plain),
    ("meta_description", Coerce::Plain),
    ("reading_time", Coerce::Plain),
    ("tags", Coerce::CommaList),
    ("featured", Coerce::Flag),
];

/// Filters for post listings
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    /// Category slug (or legacy category name)
    pub category: Option<String>,
    pub search: Option<String>,
    /// Admin listings only; public listings are always `published`
    pub status: Option<String>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    pub posts: Vec<Value>,
    pub pagination: Value,
}

fn projection(categories_have_slug: bool) -> Projection {
    Projection::qualified("p")
        .field("id")
        .field("title")
        .with(FieldSpec::new("slug").column("slug").fallback(Fallback::slug_from("`p`.`title`")))
        .field_or("excerpt", Fallback::EmptyString)
        .field_or("content", Fallback::EmptyString)
        .field("featured_image")
        .field_or("tags", Fallback::EmptyString)
        .field_or("status", Fallback::Expr("'published'".to_string()))
        .field("meta_title")
        .field("meta_description")
        .field_or("views", Fallback::Zero)
        .field_or("featured", Fallback::Zero)
        .field("reading_time")
        .field("author_id")
        .with(FieldSpec::new("published_at").column("published_at").column("created_at"))
        .field("created_at")
        .field("updated_at")
        .field("category_id")
        .with(
            FieldSpec::new("category_name")
                .when("category_id", "`c`.`name`")
                .column("category"),
        )
        .with(FieldSpec::new("category_slug").when("category_id", category_slug_expr(categories_have_slug)))
}

fn category_slug_expr(categories_have_slug: bool) -> String {
    if categories_have_slug {
        "`c`.`slug`".to_string()
    } else {
        Fallback::slug_from("`c`.`name`").to_sql()
    }
}

/// Read shape of a post row: the probed `posts` columns and whether the
/// joined `categories` table keeps its own slugs
struct Shape {
    columns: ColumnMap,
    categories_have_slug: bool,
}

impl Shape {
    fn join(&self) -> &'static str {
        if self.columns.has("category_id") {
            " LEFT JOIN `categories` `c` ON `c`.`id` = `p`.`category_id`"
        } else {
            ""
        }
    }

    fn order_by(&self) -> &'static str {
        if self.columns.has("published_at") {
            "`p`.`published_at` DESC, `p`.`id` DESC"
        } else if self.columns.has("created_at") {
            "`p`.`created_at` DESC, `p`.`id` DESC"
        } else {
            "`p`.`id` DESC"
        }
    }

    fn slug_expr(&self) -> String {
        if self.columns.has("slug") {
            "`p`.`slug`".to_string()
        } else {
            Fallback::slug_from("`p`.`title`").to_sql()
        }
    }

    fn select_sql(&self, filter: &WhereClause) -> String {
        format!(
            "SELECT {} FROM `posts` `p`{} WHERE {}",
            projection(self.categories_have_slug).to_sql(&self.columns),
            self.join(),
            filter.to_sql()
        )
    }
}

/// Stored shapes to API shapes: tags as an array, featured as a boolean
fn present(mut record: Record) -> Value {
    let tags = parse_list(record.get("tags"));
    let featured = record.get_bool("featured").unwrap_or(false);
    record.set("tags", tags).set("featured", featured);
    record.into_json()
}

/// Queue the fields every post write shares. Slug, status defaults and
/// timestamps need the database or the clock and are left to the caller.
fn prepare_write<'m>(columns: &'m ColumnMap, input: &Record) -> Result<WriteSet<'m>, RecordError> {
    let mut write = WriteSet::new(columns);
    if input.contains("title") {
        write.set("title", input.require_text("title")?);
    }
    copy_fields(&mut write, input, CONTENT_FIELDS);
    write.set_preferred(&category_candidates(input));
    if let Some(status) = read_status(input, STATUSES)? {
        write.set("status", status);
    }
    Ok(write)
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Post not found".to_string())
}

pub struct BlogService {
    pool: MySqlPool,
    prober: SchemaProber,
    invalidator: CacheInvalidator,
}

impl BlogService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            prober: SchemaProber::new(state.pool.clone()),
            invalidator: state.invalidator(),
        }
    }

    async fn read_shape(&self) -> ServiceResult<Shape> {
        let columns = self.prober.detect_columns(TABLE, &projection(true).columns()).await?;
        let categories_have_slug =
            columns.has("category_id") && self.prober.column_exists("categories", "slug").await?;
        Ok(Shape { columns, categories_have_slug })
    }

    /// Published posts, newest first
    pub async fn list_published(&self, query: &PostQuery) -> ServiceResult<PostPage> {
        let shape = self.read_shape().await?;
        let mut filter = WhereClause::new();
        if shape.columns.has("status") {
            filter.and("`p`.`status` = ?", [Value::from("published")]);
        }
        self.list(&shape, filter, query).await
    }

    /// Every post regardless of status, for the back office
    pub async fn list_all(&self, query: &PostQuery) -> ServiceResult<PostPage> {
        let shape = self.read_shape().await?;
        let mut filter = WhereClause::new();
        if let Some(status) = query.status.as_deref().filter(|_| shape.columns.has("status")) {
            filter.and("`p`.`status` = ?", [Value::from(status)]);
        }
        self.list(&shape, filter, query).await
    }

    async fn list(&self, shape: &Shape, mut filter: WhereClause, query: &PostQuery) -> ServiceResult<PostPage> {
        let columns = &shape.columns;
        if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
            if columns.has("category_id") {
                let expr = category_slug_expr(shape.categories_have_slug);
                filter.and(format!("{expr} = ?"), [Value::from(category)]);
            } else if columns.has("category") {
                filter.and("`p`.`category` = ?", [Value::from(category)]);
            }
        }
        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let exprs: Vec<String> = ["title", "excerpt", "content"]
                .iter()
                .filter(|c| columns.has(c))
                .map(|c| format!("`p`.`{c}`"))
                .collect();
            filter.and_any_like(&exprs, search);
        }

        let total = SqlResult::new(
            format!("SELECT COUNT(*) FROM `posts` `p`{} WHERE {}", shape.join(), filter.to_sql()),
            filter.params().to_vec(),
        )
        .fetch_count(&self.pool)
        .await?;

        let mut params = filter.params().to_vec();
        params.push(Value::from(query.pagination.limit));
        params.push(Value::from(query.pagination.offset()));
        let rows = SqlResult::new(
            format!("{} ORDER BY {} LIMIT ? OFFSET ?", shape.select_sql(&filter), shape.order_by()),
            params,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(PostPage {
            posts: rows.into_iter().map(present).collect(),
            pagination: query.pagination.to_json(total),
        })
    }

    async fn fetch_one(&self, shape: &Shape, filter: &WhereClause) -> ServiceResult<Option<Record>> {
        let sql = SqlResult::new(format!("{} LIMIT 1", shape.select_sql(filter)), filter.params().to_vec());
        Ok(sql.fetch_optional(&self.pool).await?)
    }

    /// A published post by slug
    pub async fn get_published_by_slug(&self, slug: &str) -> ServiceResult<Value> {
        let shape = self.read_shape().await?;
        let mut filter = WhereClause::new();
        filter.and(format!("{} = ?", shape.slug_expr()), [Value::from(slug)]);
        if shape.columns.has("status") {
            filter.and("`p`.`status` = ?", [Value::from("published")]);
        }
        self.fetch_one(&shape, &filter).await?.map(present).ok_or_else(not_found)
    }

    async fn find_record(&self, id: i64) -> ServiceResult<Option<Record>> {
        let shape = self.read_shape().await?;
        let mut filter = WhereClause::new();
        filter.and("`p`.`id` = ?", [Value::from(id)]);
        self.fetch_one(&shape, &filter).await
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Value> {
        self.find_record(id).await?.map(present).ok_or_else(not_found)
    }

    /// Create a post. `title` and `content` are required; the slug comes from
    /// the title unless one is given, and publishing stamps `published_at`.
    pub async fn create(&self, input: Record, author_id: Option<i64>) -> ServiceResult<Value> {
        let title = input.require_text("title")?.to_string();
        input.require_text("content")?;

        let columns = self.prober.detect_columns(TABLE, WRITE_COLUMNS).await?;
        let mut write = prepare_write(&columns, &input)?;

        let status = read_status(&input, STATUSES)?.unwrap_or_else(|| "draft".to_string());
        write.set("status", status.as_str());

        let slug = if columns.has("slug") {
            let slug = resolve_slug(&self.pool, TABLE, input.get_text("slug"), &title, None).await?;
            write.set("slug", slug.as_str());
            slug
        } else {
            slugify(&title)
        };

        let published_at = input
            .get_text("published_at")
            .map(normalize_timestamp)
            .or_else(|| (status == "published").then(now_timestamp));
        if let Some(published_at) = published_at {
            write.set("published_at", published_at);
        }
        if let (Some(author_id), false) = (author_id, input.contains("author_id")) {
            write.set("author_id", author_id);
        }

        let result = write.insert_sql().execute(&self.pool).await?;
        let id = result.last_insert_id() as i64;
        info!(table = TABLE, id, slug = %slug, status = %status, "Created post");

        self.invalidator.invalidate_blog_cache(Some(&slug));
        self.get_by_id(id).await
    }

    /// Apply the supplied fields only. The slug changes only when one is given.
    pub async fn update(&self, id: i64, input: Record) -> ServiceResult<Value> {
        let existing = self.find_record(id).await?.ok_or_else(not_found)?;
        let columns = self.prober.detect_columns(TABLE, WRITE_COLUMNS).await?;
        let mut write = prepare_write(&columns, &input)?;

        let old_slug = existing.get_str("slug").unwrap_or_default().to_string();
        let mut slug = old_slug.clone();
        if let Some(requested) = input.get_text("slug").filter(|_| columns.has("slug")) {
            slug = resolve_slug(&self.pool, TABLE, Some(requested), requested, Some(id)).await?;
            write.set("slug", slug.as_str());
        }

        let publishing = read_status(&input, STATUSES)?.as_deref() == Some("published");
        let published_at = input
            .get_text("published_at")
            .map(normalize_timestamp)
            .or_else(|| (publishing && existing.get("published_at").is_none()).then(now_timestamp));
        if let Some(published_at) = published_at {
            write.set("published_at", published_at);
        }

        match write.update_sql("id", id) {
            Some(sql) => {
                sql.execute(&self.pool).await?;
                info!(table = TABLE, id, slug = %slug, columns = write.columns().len(), "Updated post");
                self.invalidator.invalidate_blog_cache(Some(&slug));
                if slug != old_slug && !old_slug.is_empty() {
                    self.invalidator.revalidate_path(&format!("/blog/{old_slug}"));
                }
            }
            None => debug!(table = TABLE, id, "No writable columns in update"),
        }

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let existing = self.find_record(id).await?.ok_or_else(not_found)?;
        SqlResult::new("DELETE FROM `posts` WHERE `id` = ?", vec![Value::from(id)])
            .execute(&self.pool)
            .await?;
        info!(table = TABLE, id, "Deleted post");

        self.invalidator.invalidate_blog_cache(existing.get_str("slug"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns(present: &[&str]) -> ColumnMap {
        let projection = projection(true);
        let probed: Vec<&str> = WRITE_COLUMNS.iter().copied().chain(projection.columns()).collect();
        ColumnMap::new(TABLE, probed.into_iter().map(|c| (c, present.contains(&c))))
    }

    fn shape(present: &[&str], categories_have_slug: bool) -> Shape {
        Shape { columns: columns(present), categories_have_slug }
    }

    fn input(value: Value) -> Record {
        Record::from_api_input(value).unwrap()
    }

    #[test]
    fn select_adapts_to_legacy_category_column() {
        let legacy = shape(&["id", "title", "content", "category", "status", "created_at"], false);
        let sql = legacy.select_sql(&WhereClause::new());

        assert!(sql.contains("`p`.`category` AS `category_name`"));
        assert!(sql.contains("NULL AS `category_slug`"));
        assert!(sql.contains("TRIM(BOTH '-' FROM REGEXP_REPLACE(LOWER(`p`.`title`), '[^a-z0-9]+', '-')) AS `slug`"));
        assert!(sql.contains("`p`.`created_at` AS `published_at`"));
        assert!(!sql.contains("JOIN"));
        assert_eq!(legacy.order_by(), "`p`.`created_at` DESC, `p`.`id` DESC");
    }

    #[test]
    fn select_joins_categories_when_normalized() {
        let normalized = shape(&["id", "title", "slug", "category_id", "published_at"], true);
        let sql = normalized.select_sql(&WhereClause::new());

        assert!(sql.contains("`c`.`name` AS `category_name`"));
        assert!(sql.contains("`c`.`slug` AS `category_slug`"));
        assert!(sql.contains("LEFT JOIN `categories` `c` ON `c`.`id` = `p`.`category_id`"));
        assert_eq!(normalized.slug_expr(), "`p`.`slug`");
    }

    #[test]
    fn category_slug_derived_from_name_when_categories_lack_slugs() {
        let joined = shape(&["id", "title", "slug", "category_id"], false);
        let sql = joined.select_sql(&WhereClause::new());

        assert!(sql.contains("LEFT JOIN `categories` `c`"));
        assert!(!sql.contains("`c`.`slug`"));
        assert!(sql.contains(
            "TRIM(BOTH '-' FROM REGEXP_REPLACE(LOWER(`c`.`name`), '[^a-z0-9]+', '-')) AS `category_slug`"
        ));
        assert_eq!(category_slug_expr(false), Fallback::slug_from("`c`.`name`").to_sql());
    }

    #[test]
    fn write_skips_missing_seo_columns() {
        let map = columns(&["title", "content", "tags", "category_id", "category", "status"]);
        let write = prepare_write(
            &map,
            &input(json!({
                "title": "Hello",
                "content": "Body",
                "meta_title": "SEO",
                "tags": ["rust", "web"],
                "category_id": 2,
                "category": "News",
                "status": "published",
            })),
        )
        .unwrap();

        let sql = write.insert_sql();
        assert_eq!(
            sql.query,
            "INSERT INTO `posts` (`title`, `content`, `tags`, `category_id`, `status`) VALUES (?, ?, ?, ?, ?)"
        );
        assert_eq!(sql.params[2], json!("rust, web"));
        assert_eq!(sql.params[3], json!(2));
    }

    #[test]
    fn write_rejects_blank_title_and_unknown_status() {
        let map = columns(&["title", "status"]);
        assert!(prepare_write(&map, &input(json!({ "title": "   " }))).is_err());
        assert!(prepare_write(&map, &input(json!({ "status": "live" }))).is_err());
    }

    #[test]
    fn presents_tags_and_flags() {
        let row = input(json!({ "title": "x", "tags": "rust, web", "featured": 1 }));
        let value = present(row);
        assert_eq!(value["tags"], json!(["rust", "web"]));
        assert_eq!(value["featured"], json!(true));
    }
}
