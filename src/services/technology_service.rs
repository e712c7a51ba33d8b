use serde_json::Value;
use sqlx::mysql::MySqlPool;
use tracing::{debug, info};

use super::{copy_fields, resolve_slug, ServiceError, ServiceResult};
use crate::cache::CacheInvalidator;
use crate::database::assembler::{Coerce, Fallback, FieldSpec, Projection, WhereClause, WriteSet};
use crate::database::record::{Record, RecordError};
use crate::database::schema::{ColumnMap, SchemaProbe, SchemaProber};
use crate::database::SqlResult;
use crate::state::AppState;

const TABLE: &str = "technologies";

const WRITE_COLUMNS: &[&str] = &["name", "slug", "icon", "color", "category", "sort_order"];

const OPTIONAL_FIELDS: &[(&str, Coerce)] = &[
    ("icon", Coerce::Plain),
    ("color", Coerce::Plain),
    ("category", Coerce::Plain),
    ("sort_order", Coerce::Plain),
];

fn projection() -> Projection {
    Projection::new()
        .field("id")
        .field("name")
        .with(FieldSpec::new("slug").column("slug").fallback(Fallback::slug_from("`name`")))
        .field("icon")
        .field("color")
        .field("category")
        .field_or("sort_order", Fallback::Zero)
        .field("created_at")
}

fn order_by(columns: &ColumnMap) -> &'static str {
    if columns.has("sort_order") {
        "`sort_order` ASC, `name` ASC"
    } else {
        "`name` ASC"
    }
}

fn prepare_write<'m>(columns: &'m ColumnMap, input: &Record) -> Result<WriteSet<'m>, RecordError> {
    let mut write = WriteSet::new(columns);
    if input.contains("name") {
        write.set("name", input.require_text("name")?);
    }
    copy_fields(&mut write, input, OPTIONAL_FIELDS);
    Ok(write)
}

fn not_found() -> ServiceError {
    ServiceError::NotFound("Technology not found".to_string())
}

pub struct TechnologyService {
    pool: MySqlPool,
    prober: SchemaProber,
    invalidator: CacheInvalidator,
}

impl TechnologyService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            prober: SchemaProber::new(state.pool.clone()),
            invalidator: state.invalidator(),
        }
    }

    async fn select(&self, filter: &WhereClause, suffix: &str) -> ServiceResult<Vec<Record>> {
        let projection = projection();
        let columns = self.prober.detect_columns(TABLE, &projection.columns()).await?;
        let sql = SqlResult::new(
            format!(
                "SELECT {} FROM `technologies` WHERE {} ORDER BY {}{}",
                projection.to_sql(&columns),
                filter.to_sql(),
                order_by(&columns),
                suffix
            ),
            filter.params().to_vec(),
        );
        Ok(sql.fetch_all(&self.pool).await?)
    }

    /// All technologies, optionally narrowed to one grouping (`frontend`, ...)
    pub async fn list(&self, category: Option<&str>) -> ServiceResult<Vec<Value>> {
        let mut filter = WhereClause::new();
        if let Some(category) = category.filter(|c| !c.is_empty()) {
            if self.prober.column_exists(TABLE, "category").await? {
                filter.and("`category` = ?", [Value::from(category)]);
            }
        }
        let rows = self.select(&filter, "").await?;
        Ok(rows.into_iter().map(Record::into_json).collect())
    }

    pub async fn get_by_id(&self, id: i64) -> ServiceResult<Value> {
        let mut filter = WhereClause::new();
        filter.and("`id` = ?", [Value::from(id)]);
        let mut rows = self.select(&filter, " LIMIT 1").await?;
        rows.pop().map(Record::into_json).ok_or_else(not_found)
    }

    pub async fn create(&self, input: Record) -> ServiceResult<Value> {
        let name = input.require_text("name")?.to_string();
        let columns = self.prober.detect_columns(TABLE, WRITE_COLUMNS).await?;
        let mut write = prepare_write(&columns, &input)?;
        if columns.has("slug") {
            let slug = resolve_slug(&self.pool, TABLE, input.get_text("slug"), &name, None).await?;
            write.set("slug", slug);
        }

        let result = write.insert_sql().execute(&self.pool).await?;
        let id = result.last_insert_id() as i64;
        info!(table = TABLE, id, name = %name, "Created technology");

        self.invalidator.invalidate_portfolio_cache(None);
        self.get_by_id(id).await
    }

    pub async fn update(&self, id: i64, input: Record) -> ServiceResult<Value> {
        self.get_by_id(id).await?;
        let columns = self.prober.detect_columns(TABLE, WRITE_COLUMNS).await?;
        let mut write = prepare_write(&columns, &input)?;
        if let Some(requested) = input.get_text("slug").filter(|_| columns.has("slug")) {
            let slug = resolve_slug(&self.pool, TABLE, Some(requested), requested, Some(id)).await?;
            write.set("slug", slug);
        }

        match write.update_sql("id", id) {
            Some(sql) => {
                sql.execute(&self.pool).await?;
                info!(table = TABLE, id, "Updated technology");
                self.invalidator.invalidate_portfolio_cache(None);
            }
            None => debug!(table = TABLE, id, "No writable columns in update"),
        }
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        let result = SqlResult::new("DELETE FROM `technologies` WHERE `id` = ?", vec![Value::from(id)])
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        info!(table = TABLE, id, "Deleted technology");

        self.invalidator.invalidate_portfolio_cache(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn select_falls_back_without_optional_columns() {
        let columns = ColumnMap::new(TABLE, [("id", true), ("name", true), ("slug", false), ("sort_order", false)]);
        let sql = projection().to_sql(&columns);
        assert!(sql.starts_with("`id`, `name`, TRIM(BOTH '-' FROM REGEXP_REPLACE(LOWER(`name`), '[^a-z0-9]+', '-')) AS `slug`, NULL AS `icon`"));
        assert!(sql.contains("0 AS `sort_order`"));
        assert_eq!(order_by(&columns), "`name` ASC");
    }

    #[test]
    fn write_keeps_present_optional_fields() {
        let columns = ColumnMap::new(TABLE, WRITE_COLUMNS.iter().map(|c| (*c, *c != "icon")));
        let input = Record::from_api_input(json!({
            "name": "Rust",
            "icon": "rust.svg",
            "color": "#dea584",
            "sort_order": 3,
        }))
        .unwrap();
        let sql = prepare_write(&columns, &input).unwrap().insert_sql();
        assert_eq!(sql.query, "INSERT INTO `technologies` (`name`, `color`, `sort_order`) VALUES (?, ?, ?)");
        assert_eq!(sql.params, vec![json!("Rust"), json!("#dea584"), json!(3)]);
    }
}
