use serde_json::Value;
use sqlx::mysql::MySqlPool;
use tracing::{debug, info};

use super::{
    category_candidates, copy_fields, normalize_timestamp, read_status, resolve_slug, ServiceError, ServiceResult,
};
use crate::cache::CacheInvalidator;
use crate::database::assembler::{Coerce, Fallback, FieldSpec, Projection, WhereClause, WriteSet};
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::record::{parse_list, Record, RecordError};
use crate::database::schema::{ColumnMap, SchemaProbe, SchemaProber};
use crate::database::slug::slugify;
use crate::database::SqlResult;
use crate::state::AppState;

const TABLE: &str = "portfolio";

pub const STATUSES: &[&str] = &["draft", "published", "archived"];

/// Portfolio category tables in preference order; older databases only have
/// `project_types`.
pub const CATEGORY_TABLES: &[&str] = &["portfolio_categories", "project_types"];

const WRITE_COLUMNS: &[&str] = &[
    "title",
    "slug",
    "description",
    "content",
    "client",
    "project_url",
    "github_url",
    "featured_image",
    "image",
    "gallery",
    "technologies",
    "status",
    "featured",
    "sort_order",
    "completed_at",
    "category_id",
    "category",
];

const CONTENT_FIELDS: &[(&str, Coerce)] = &[
    ("description", Coerce::Plain),
    ("content", Coerce::Plain),
    ("client", Coerce::Plain),
    ("project_url", Coerce::Plain),
    ("github_url", Coerce::Plain),
    ("gallery", Coerce::JsonText),
    ("technologies", Coerce::JsonText),
    ("featured", Coerce::Flag),
    ("sort_order", Coerce::Plain),
];

/// The category table a database carries and whether it has its own slugs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryTable {
    pub name: &'static str,
    pub has_slug: bool,
}

impl CategoryTable {
    fn slug_expr(&self) -> String {
        if self.has_slug {
            "`pc`.`slug`".to_string()
        } else {
            Fallback::slug_from("`pc`.`name`").to_sql()
        }
    }
}

/// First of [`CATEGORY_TABLES`] that exists, or `None`
pub async fn find_category_table(prober: &dyn SchemaProbe) -> Result<Option<CategoryTable>, DatabaseError> {
    for name in CATEGORY_TABLES.iter().copied() {
        if prober.table_exists(name).await? {
            let has_slug = prober.column_exists(name, "slug").await?;
            return Ok(Some(CategoryTable { name, has_slug }));
        }
    }
    Ok(None)
}

#[derive(Debug, Clone, Default)]
pub struct PortfolioQuery {
    /// Category slug (or legacy category name)
    pub category: Option<String>,
    pub featured: Option<bool>,
    /// Admin listings only; public listings are always `published`
    pub status: Option<String>,
    pub limit: Option<u32>,
}

/// Read shape of a portfolio row
struct Shape {
    columns: ColumnMap,
    category: Option<CategoryTable>,
}

impl Shape {
    fn joined(&self) -> Option<&CategoryTable> {
        self.category.as_ref().filter(|_| self.columns.has("category_id"))
    }

    fn from_clause(&self) -> String {
        match self.joined() {
            Some(table) => format!(
                "`portfolio` `p` LEFT JOIN {} `pc` ON `pc`.`id` = `p`.`category_id`",
                DatabaseManager::quote_identifier(table.name)
            ),
            None => "`portfolio` `p`".to_string(),
        }
    }

    fn select_sql(&self, filter: &WhereClause) -> String {
        format!(
            "SELECT {} FROM {} WHERE {}",
            projection(self.category.as_ref()).to_sql(&self.columns),
            self.from_clause(),
            filter.to_sql()
        )
    }

    fn order_by(&self) -> String {
        let mut order = Vec::new();
        if self.columns.has("sort_order") {
            order.push("`p`.`sort_order` ASC");
        }
        if self.columns.has("created_at") {
            order.push("`p`.`created_at` DESC");
        }
        order.push("`p`.`id` DESC");
        order.join(", ")
    }

    fn slug_expr(&self) -> String {
        if self.columns.has("slug") {
            "`p`.`slug`".to_string()
        } else {
            Fallback::slug_from("`p`.`title`").to_sql()
        }
    }
}

fn projection(category: Option<&CategoryTable>) -> Projection {
    let mut category_name = FieldSpec::new("category_name");
    let mut category_slug = FieldSpec::new("category_slug");
    if let Some(table) = category {
        category_name = category_name.when("category_id", "`pc`.`name`");
        category_slug = category_slug.when("category_id", table.slug_expr());
    }

    Projection::qualified("p")
        .field("id")
        .field("title")
        .with(FieldSpec::new("slug").column("slug").fallback(Fallback::slug_from("`p`.`title`")))
        .field_or("description", Fallback::EmptyString)
        .field("content")
        .field("client")
        .field("project_url")
        .field("github_url")
        .with(FieldSpec::new("featured_image").column("featured_image").column("image"))
        .field_or("gallery", Fallback::Expr("'[]'".to_string()))
        .field_or("technologies", Fallback::Expr("'[]'".to_string()))
        .field_or("status", Fallback::Expr("'published'".to_string()))
        .field_or("featured", Fallback::Zero)
        .field_or("sort_order", Fallback::Zero)
        .field("completed_at")
        .field("created_at")
        .field("updated_at")
        .field("category_id")
        .with(category_name.column("category"))
        .with(category_slug)
}

/// Stored shapes to API shapes: JSON-text lists as arrays, featured as a boolean
fn present(mut record: Record) -> Value {
    let technologies = parse_list(record.get("technologies"));
    let gallery = parse_list(record.get("gallery"));
    let featured = record.get_bool("featured").unwrap_or(false);
    record
        .set("technologies", technologies)
        .set("gallery", gallery)
        .set("featured", featured);
    record.into_json()
}

fn prepare_write<'m>(columns: &'m ColumnMap, input: &Record) -> Result<WriteSet<'m>, RecordError> {
    let mut write = WriteSet::new(columns);
    if input.contains("title") {
        write.set("title", input.require_text("title")?);
    }
    copy_fields(&mut write, input, CONTENT_FIELDS);

    // `image` is the older name of the cover image column
    if let Some(image) = ["featured_image", "image"].iter().find(|f| input.contains(f)) {
        let value = input.get(image).cloned().unwrap_or(Value::Null);
        write.set_preferred(&[("featured_image", value.clone()), ("image", value)]);
    }
    write.set_preferred(&category_candidates(input));

    if let Some(status) = read_status(input, STATUSES)? {
        write.set("status", status);
    }
    if input.contains("completed_at") {
        let completed = input.get_text("completed_at").map(normalize_timestamp);
        write.set("completed_at", completed);
    }
    Ok(write)
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Portfolio item not found".to_string())
}

pub struct PortfolioService {
    pool: MySqlPool,
    prober: SchemaProber,
    invalidator: CacheInvalidator,
}

impl PortfolioService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            prober: SchemaProber::new(state.pool.clone()),
            invalidator: state.invalidator(),
        }
    }

    async fn read_shape(&self) -> ServiceResult<Shape> {
        let category = find_category_table(&self.prober).await?;
        let projection = projection(category.as_ref());
        let columns = self.prober.detect_columns(TABLE, &projection.columns()).await?;
        Ok(Shape { columns, category })
    }

    pub async fn list_published(&self, query: &PortfolioQuery) -> ServiceResult<Vec<Value>> {
        let shape = self.read_shape().await?;
        let mut filter = WhereClause::new();
        if shape.columns.has("status") {
            filter.and("`p`.`status` = ?", [Value::from("published")]);
        }
        self.list(&shape, filter, query).await
    }

    pub async fn list_all(&self, query: &PortfolioQuery) -> ServiceResult<Vec<Value>> {
        let shape = self.read_shape().await?;
        let mut filter = WhereClause::new();
        if let Some(status) = query.status.as_deref().filter(|_| shape.columns.has("status")) {
            filter.and("`p`.`status` = ?", [Value::from(status)]);
        }
        self.list(&shape, filter, query).await
    }

    async fn list(&self, shape: &Shape, mut filter: WhereClause, query: &PortfolioQuery) -> ServiceResult<Vec<Value>> {
        if let Some(category) = query.category.as_deref().filter(|c| !c.is_empty()) {
            match shape.joined() {
                Some(table) => {
                    filter.and(format!("{} = ?", table.slug_expr()), [Value::from(category)]);
                }
                None if shape.columns.has("category") => {
                    filter.and("`p`.`category` = ?", [Value::from(category)]);
                }
                None => {}
            }
        }
        if let Some(featured) = query.featured.filter(|_| shape.columns.has("featured")) {
            filter.and("`p`.`featured` = ?", [Value::from(featured as i64)]);
        }

        let mut sql = format!("{} ORDER BY {}", shape.select_sql(&filter), shape.order_by());
        let mut params = filter.params().to_vec();
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::from(limit));
        }

        let rows = SqlResult::new(sql, params).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(present).collect())
    }

    async fn fetch_one(&self, shape: &Shape, filter: &WhereClause) -> ServiceResult<Option<Record>> {
        let sql = SqlResult::new(format!("{} LIMIT 1", shape.select_sql(filter)), filter.params().to_vec());
        Ok(sql.fetch_optional(&self.pool).await?)
    }

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

    pub async fn create(&self, input: Record) -> ServiceResult<Value> {
        let title = input.require_text("title")?.to_string();

        let columns = self.prober.detect_columns(TABLE, WRITE_COLUMNS).await?;
        let mut write = prepare_write(&columns, &input)?;
        if read_status(&input, STATUSES)?.is_none() {
            write.set("status", "published");
        }

        let slug = if columns.has("slug") {
            let slug = resolve_slug(&self.pool, TABLE, input.get_text("slug"), &title, None).await?;
            write.set("slug", slug.as_str());
            slug
        } else {
            slugify(&title)
        };

        let result = write.insert_sql().execute(&self.pool).await?;
        let id = result.last_insert_id() as i64;
        info!(table = TABLE, id, slug = %slug, "Created portfolio item");

        self.invalidator.invalidate_portfolio_cache(Some(&slug));
        self.get_by_id(id).await
    }

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

        match write.update_sql("id", id) {
            Some(sql) => {
                sql.execute(&self.pool).await?;
                info!(table = TABLE, id, slug = %slug, "Updated portfolio item");
                self.invalidator.invalidate_portfolio_cache(Some(&slug));
                if slug != old_slug && !old_slug.is_empty() {
                    self.invalidator.revalidate_path(&format!("/portfolio/{old_slug}"));
                }
            }
            None => debug!(table = TABLE, id, "No writable columns in update"),
        }

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let existing = self.find_record(id).await?.ok_or_else(not_found)?;
        SqlResult::new("DELETE FROM `portfolio` WHERE `id` = ?", vec![Value::from(id)])
            .execute(&self.pool)
            .await?;
        info!(table = TABLE, id, "Deleted portfolio item");

        self.invalidator.invalidate_portfolio_cache(existing.get_str("slug"));
        Ok(())
    }
}
