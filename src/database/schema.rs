//! Runtime schema probing against `information_schema`.
//!
//! Databases sharing this codebase do not all carry the same optional columns,
//! so services ask the live catalog which columns exist before assembling a
//! query. Nothing here is cached: every call is one catalog round trip and a
//! [`ColumnMap`] lives for a single request.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::mysql::MySqlPool;
use std::collections::BTreeMap;

use crate::database::manager::DatabaseError;

/// Which of the requested columns exist on one table.
///
/// Built once from probe results and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMap {
    table: String,
    columns: BTreeMap<String, bool>,
}

impl ColumnMap {
    pub fn new<I, S>(table: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        Self {
            table: table.into(),
            columns: entries.into_iter().map(|(c, present)| (c.into(), present)).collect(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// True only for columns that were probed and found.
    pub fn has(&self, column: &str) -> bool {
        self.columns.get(column).copied().unwrap_or(false)
    }

    /// The first candidate that exists, in preference order
    pub fn first_present<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates.iter().copied().find(|c| self.has(c))
    }

    pub fn present(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter(|(_, p)| **p).map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.columns.iter().map(|(c, p)| (c.as_str(), *p))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[async_trait]
pub trait SchemaProbe: Send + Sync {
    async fn table_exists(&self, table: &str) -> Result<bool, DatabaseError>;

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, DatabaseError>;

    /// One `column_exists` per column, in order. Keys of the result are exactly
    /// the requested columns.
    async fn detect_columns(&self, table: &str, columns: &[&str]) -> Result<ColumnMap, DatabaseError> {
        let mut entries = Vec::with_capacity(columns.len());
        for column in columns {
            let present = self.column_exists(table, column).await?;
            entries.push((column.to_string(), present));
        }
        Ok(ColumnMap::new(table, entries))
    }
}

/// Live prober backed by the shared pool
#[derive(Clone)]
pub struct SchemaProber {
    pool: MySqlPool,
}

impl SchemaProber {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SchemaProbe for SchemaProber {
    async fn table_exists(&self, table: &str) -> Result<bool, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.TABLES WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        tracing::trace!(table, count, "probed table");
        Ok(count > 0)
    }

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND COLUMN_NAME = ?",
        )
        .bind(table)
        .bind(column)
        .fetch_one(&self.pool)
        .await?;
        tracing::trace!(table, column, count, "probed column");
        Ok(count > 0)
    }
}

/// Fixed schema used where no live catalog is available (tests, dry runs).
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    tables: BTreeMap<String, Vec<String>>,
}

impl StaticSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: &str, columns: &[&str]) -> Self {
        self.tables
            .insert(table.to_string(), columns.iter().map(|c| c.to_string()).collect());
        self
    }
}

#[async_trait]
impl SchemaProbe for StaticSchema {
    async fn table_exists(&self, table: &str) -> Result<bool, DatabaseError> {
        Ok(self.tables.contains_key(table))
    }

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, DatabaseError> {
        Ok(self
            .tables
            .get(table)
            .map(|cols| cols.iter().any(|c| c == column))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> StaticSchema {
        StaticSchema::new()
            .with_table("posts", &["id", "title", "slug", "category_id"])
            .with_table("categories", &["id", "name"])
    }

    #[tokio::test]
    async fn detect_columns_keys_match_request() {
        let map = schema()
            .detect_columns("posts", &["slug", "category", "category_id", "meta_title"])
            .await
            .unwrap();

        let keys: Vec<&str> = map.iter().map(|(c, _)| c).collect();
        assert_eq!(keys.len(), 4);
        for c in ["slug", "category", "category_id", "meta_title"] {
            assert!(keys.contains(&c), "missing key {c}");
        }
        assert!(map.has("slug"));
        assert!(map.has("category_id"));
        assert!(!map.has("category"));
        assert!(!map.has("meta_title"));
    }

    #[tokio::test]
    async fn unknown_table_reports_nothing() {
        let probe = schema();
        assert!(!probe.table_exists("project_types").await.unwrap());
        let map = probe.detect_columns("project_types", &["name"]).await.unwrap();
        assert_eq!(map.len(), 1);
        assert!(!map.has("name"));
    }

    #[test]
    fn unprobed_columns_are_absent() {
        let map = ColumnMap::new("posts", [("slug", true)]);
        assert!(map.has("slug"));
        assert!(!map.has("title"));
        assert_eq!(map.first_present(&["category_id", "slug"]), Some("slug"));
        assert_eq!(map.present().collect::<Vec<_>>(), vec!["slug"]);
    }
}
