//! Builds SQL around whichever optional columns a table actually has.
//!
//! Reads go through a [`Projection`]: each logical field names its candidate
//! columns in preference order and a fallback literal, so the result row keeps
//! the same shape whatever the table looks like. Writes go through a
//! [`WriteSet`], which drops any column the [`ColumnMap`] does not report.

use serde_json::Value;

use crate::database::manager::DatabaseManager;
use crate::database::query_builder::SqlResult;
use crate::database::schema::ColumnMap;

/// What to emit when none of a field's columns exist
#[derive(Debug, Clone, PartialEq)]
pub enum Fallback {
    Null,
    EmptyString,
    Zero,
    /// Raw SQL expression, e.g. a slug computed from a name column
    Expr(String),
}

impl Fallback {
    /// Slug computed in SQL from another column, same rules as
    /// [`slugify`](crate::database::slug::slugify). Needs MySQL 8 regex functions.
    pub fn slug_from(column_expr: &str) -> Self {
        Fallback::Expr(format!(
            "TRIM(BOTH '-' FROM REGEXP_REPLACE(LOWER({column_expr}), '[^a-z0-9]+', '-'))"
        ))
    }

    pub fn to_sql(&self) -> String {
        match self {
            Fallback::Null => "NULL".to_string(),
            Fallback::EmptyString => "''".to_string(),
            Fallback::Zero => "0".to_string(),
            Fallback::Expr(expr) => expr.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct Source {
    /// Column whose presence enables this source
    column: String,
    /// Expression to select instead of the bare column
    expr: Option<String>,
}

/// One logical output column of a read
#[derive(Debug, Clone)]
pub struct FieldSpec {
    alias: String,
    sources: Vec<Source>,
    fallback: Fallback,
}

impl FieldSpec {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            sources: Vec::new(),
            fallback: Fallback::Null,
        }
    }

    /// Read straight from `column` when present
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.sources.push(Source { column: column.into(), expr: None });
        self
    }

    /// Emit `expr` when `column` is present (joins, computed values)
    pub fn when(mut self, column: impl Into<String>, expr: impl Into<String>) -> Self {
        self.sources.push(Source { column: column.into(), expr: Some(expr.into()) });
        self
    }

    pub fn fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }
}

/// A SELECT column list that adapts to a [`ColumnMap`]
#[derive(Debug, Clone, Default)]
pub struct Projection {
    qualifier: Option<String>,
    fields: Vec<FieldSpec>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefix bare columns with a table alias (`p`.`title`)
    pub fn qualified(alias: impl Into<String>) -> Self {
        Self { qualifier: Some(alias.into()), fields: Vec::new() }
    }

    /// Field read from the column of the same name, `NULL` when absent
    pub fn field(self, name: &str) -> Self {
        self.with(FieldSpec::new(name).column(name))
    }

    /// Field read from the column of the same name with a chosen fallback
    pub fn field_or(self, name: &str, fallback: Fallback) -> Self {
        self.with(FieldSpec::new(name).column(name).fallback(fallback))
    }

    pub fn with(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Every column this projection may read; probe these before building.
    pub fn columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for source in self.fields.iter().flat_map(|f| f.sources.iter()) {
            if !out.contains(&source.column.as_str()) {
                out.push(source.column.as_str());
            }
        }
        out
    }

    fn column_ref(&self, column: &str) -> String {
        match &self.qualifier {
            Some(q) => format!("{}.{}", DatabaseManager::quote_identifier(q), DatabaseManager::quote_identifier(column)),
            None => DatabaseManager::quote_identifier(column),
        }
    }

    pub fn select_list(&self, columns: &ColumnMap) -> Vec<String> {
        self.fields
            .iter()
            .map(|field| {
                let alias = DatabaseManager::quote_identifier(&field.alias);
                match field.sources.iter().find(|s| columns.has(&s.column)) {
                    Some(Source { column, expr: None }) if *column == field.alias && self.qualifier.is_none() => alias,
                    Some(Source { column, expr: None }) => format!("{} AS {}", self.column_ref(column), alias),
                    Some(Source { expr: Some(expr), .. }) => format!("{expr} AS {alias}"),
                    None => format!("{} AS {}", field.fallback.to_sql(), alias),
                }
            })
            .collect()
    }

    pub fn to_sql(&self, columns: &ColumnMap) -> String {
        self.select_list(columns).join(", ")
    }
}

/// How a logical value is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coerce {
    /// As given; arrays/objects become JSON text when bound
    Plain,
    /// Booleans and truthy strings to 0/1
    Flag,
    /// Arrays joined with ", "
    CommaList,
    /// Arrays and objects serialized to JSON text
    JsonText,
}

pub fn coerce(value: Value, how: Coerce) -> Value {
    match (how, value) {
        (_, Value::Null) => Value::Null,
        (Coerce::Flag, Value::Bool(b)) => Value::from(b as i64),
        (Coerce::Flag, Value::Number(n)) => Value::from((n.as_f64().unwrap_or(0.0) != 0.0) as i64),
        (Coerce::Flag, Value::String(s)) => {
            let on = matches!(s.trim(), "1" | "true" | "on" | "yes");
            Value::from(on as i64)
        }
        (Coerce::Flag, other) => Value::from(!is_empty_value(&other) as i64),
        (Coerce::CommaList, Value::Array(items)) => Value::String(
            items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.trim().to_string(),
                    other => other.to_string(),
                })
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        ),
        (Coerce::JsonText, v @ (Value::Array(_) | Value::Object(_))) => Value::String(v.to_string()),
        (Coerce::JsonText, Value::String(s)) => {
            // Comma-separated input is accepted for list columns
            if s.trim_start().starts_with('[') || s.trim_start().starts_with('{') {
                Value::String(s)
            } else {
                let items: Vec<Value> = s
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| Value::String(p.to_string()))
                    .collect();
                Value::String(Value::Array(items).to_string())
            }
        }
        (Coerce::Plain, Value::Bool(b)) => Value::from(b as i64),
        (_, v) => v,
    }
}

fn is_empty_value(v: &Value) -> bool {
    match v {
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Parallel column/value lists for an INSERT or UPDATE, restricted to the
/// columns present in a [`ColumnMap`].
#[derive(Debug, Clone)]
pub struct WriteSet<'m> {
    columns_map: &'m ColumnMap,
    columns: Vec<String>,
    values: Vec<Value>,
}

impl<'m> WriteSet<'m> {
    pub fn new(columns_map: &'m ColumnMap) -> Self {
        Self { columns_map, columns: Vec::new(), values: Vec::new() }
    }

    /// Queue `column = value`; silently skipped when the column is absent.
    /// A column already queued is overwritten.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> bool {
        self.set_coerced(column, value.into(), Coerce::Plain)
    }

    pub fn set_coerced(&mut self, column: &str, value: Value, how: Coerce) -> bool {
        if !self.columns_map.has(column) {
            tracing::trace!(table = self.columns_map.table(), column, "skipping absent column");
            return false;
        }
        let value = coerce(value, how);
        match self.columns.iter().position(|c| c == column) {
            Some(i) => self.values[i] = value,
            None => {
                self.columns.push(column.to_string());
                self.values.push(value);
            }
        }
        true
    }

    /// Write to the first present candidate only; returns the column used
    pub fn set_preferred(&mut self, candidates: &[(&str, Value)]) -> Option<String> {
        let (column, value) = candidates.iter().find(|(c, _)| self.columns_map.has(c))?;
        self.set(column, value.clone());
        Some(column.to_string())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn insert_sql(&self) -> SqlResult {
        let table = DatabaseManager::quote_identifier(self.columns_map.table());
        let columns: Vec<String> = self.columns.iter().map(|c| DatabaseManager::quote_identifier(c)).collect();
        let placeholders = vec!["?"; self.columns.len()].join(", ");
        SqlResult::new(
            format!("INSERT INTO {} ({}) VALUES ({})", table, columns.join(", "), placeholders),
            self.values.clone(),
        )
    }

    /// `None` when nothing is queued; an empty SET clause is not valid SQL
    pub fn update_sql(&self, key_column: &str, key: impl Into<Value>) -> Option<SqlResult> {
        if self.is_empty() {
            return None;
        }
        let table = DatabaseManager::quote_identifier(self.columns_map.table());
        let assignments: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} = ?", DatabaseManager::quote_identifier(c)))
            .collect();
        let mut params = self.values.clone();
        params.push(key.into());
        Some(SqlResult::new(
            format!(
                "UPDATE {} SET {} WHERE {} = ?",
                table,
                assignments.join(", "),
                DatabaseManager::quote_identifier(key_column)
            ),
            params,
        ))
    }
}

/// AND-joined WHERE conditions with their positional parameters
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
    conditions: Vec<String>,
    params: Vec<Value>,
}

impl WhereClause {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition; `sql` carries one `?` per entry in `params`
    pub fn and(&mut self, sql: impl Into<String>, params: impl IntoIterator<Item = Value>) -> &mut Self {
        self.conditions.push(sql.into());
        self.params.extend(params);
        self
    }

    /// `(a LIKE ? OR b LIKE ?)` over the given column expressions
    pub fn and_any_like(&mut self, exprs: &[String], needle: &str) -> &mut Self {
        if exprs.is_empty() {
            return self;
        }
        let pattern = Value::String(format!("%{needle}%"));
        let sql = exprs.iter().map(|e| format!("{e} LIKE ?")).collect::<Vec<_>>().join(" OR ");
        self.and(format!("({sql})"), std::iter::repeat(pattern).take(exprs.len()))
    }

    pub fn to_sql(&self) -> String {
        if self.conditions.is_empty() {
            "1=1".to_string()
        } else {
            self.conditions.join(" AND ")
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn where_clause_joins_conditions() {
        let mut filter = WhereClause::new();
        assert_eq!(filter.to_sql(), "1=1");

        filter.and("`p`.`status` = ?", [json!("published")]);
        filter.and_any_like(&["`p`.`title`".to_string(), "`p`.`excerpt`".to_string()], "rust");
        filter.and_any_like(&[], "ignored");
        assert_eq!(
            filter.to_sql(),
            "`p`.`status` = ? AND (`p`.`title` LIKE ? OR `p`.`excerpt` LIKE ?)"
        );
        assert_eq!(filter.params(), [json!("published"), json!("%rust%"), json!("%rust%")]);
    }

    fn posts(present: &[&str], absent: &[&str]) -> ColumnMap {
        ColumnMap::new(
            "posts",
            present.iter().map(|c| (*c, true)).chain(absent.iter().map(|c| (*c, false))),
        )
    }

    #[test]
    fn projection_falls_back_for_absent_columns() {
        let projection = Projection::new()
            .field("title")
            .field_or("excerpt", Fallback::EmptyString)
            .field_or("views", Fallback::Zero)
            .with(FieldSpec::new("slug").column("slug").fallback(Fallback::slug_from("`title`")));

        let map = posts(&["title"], &["excerpt", "views", "slug"]);
        assert_eq!(
            projection.select_list(&map),
            vec![
                "`title`".to_string(),
                "'' AS `excerpt`".to_string(),
                "0 AS `views`".to_string(),
                "TRIM(BOTH '-' FROM REGEXP_REPLACE(LOWER(`title`), '[^a-z0-9]+', '-')) AS `slug`".to_string(),
            ]
        );
    }

    #[test]
    fn projection_prefers_normalized_column() {
        let projection = Projection::qualified("p").with(
            FieldSpec::new("category_name")
                .when("category_id", "`c`.`name`")
                .column("category"),
        );

        let both = posts(&["category_id", "category"], &[]);
        assert_eq!(projection.to_sql(&both), "`c`.`name` AS `category_name`");

        let legacy = posts(&["category"], &["category_id"]);
        assert_eq!(projection.to_sql(&legacy), "`p`.`category` AS `category_name`");

        let neither = posts(&[], &["category", "category_id"]);
        assert_eq!(projection.to_sql(&neither), "NULL AS `category_name`");
    }

    #[test]
    fn projection_lists_probe_columns_once() {
        let projection = Projection::new()
            .field("title")
            .with(FieldSpec::new("name").column("title"))
            .with(FieldSpec::new("category_name").when("category_id", "x").column("category"));
        assert_eq!(projection.columns(), vec!["title", "category_id", "category"]);
    }

    #[test]
    fn writes_only_present_columns() {
        let map = posts(&["title", "content", "featured"], &["meta_title", "tags"]);
        let mut write = WriteSet::new(&map);
        assert!(write.set("title", "Hello"));
        assert!(!write.set("meta_title", "SEO"));
        assert!(write.set_coerced("featured", json!(true), Coerce::Flag));
        assert!(!write.set_coerced("tags", json!(["a", "b"]), Coerce::CommaList));
        assert!(write.set("content", "Body"));

        let sql = write.insert_sql();
        assert_eq!(sql.query, "INSERT INTO `posts` (`title`, `featured`, `content`) VALUES (?, ?, ?)");
        assert_eq!(sql.params, vec![json!("Hello"), json!(1), json!("Body")]);
        assert!(!sql.query.contains("meta_title"));
        assert!(!sql.query.contains("tags"));
    }

    #[test]
    fn update_appends_key_parameter() {
        let map = posts(&["title", "status"], &[]);
        let mut write = WriteSet::new(&map);
        write.set("title", "Old");
        write.set("status", "published");
        write.set("title", "New");

        let sql = write.update_sql("id", 7).unwrap();
        assert_eq!(sql.query, "UPDATE `posts` SET `title` = ?, `status` = ? WHERE `id` = ?");
        assert_eq!(sql.params, vec![json!("New"), json!("published"), json!(7)]);
    }

    #[test]
    fn empty_update_builds_nothing() {
        let map = posts(&[], &["title"]);
        let mut write = WriteSet::new(&map);
        write.set("title", "x");
        assert!(write.update_sql("id", 1).is_none());
    }

    #[test]
    fn preferred_column_tie_break() {
        let both = posts(&["category_id", "category"], &[]);
        let mut write = WriteSet::new(&both);
        let used = write.set_preferred(&[("category_id", json!(3)), ("category", json!("News"))]);
        assert_eq!(used.as_deref(), Some("category_id"));
        assert_eq!(write.columns(), ["category_id".to_string()]);

        let legacy = posts(&["category"], &["category_id"]);
        let mut write = WriteSet::new(&legacy);
        let used = write.set_preferred(&[("category_id", json!(3)), ("category", json!("News"))]);
        assert_eq!(used.as_deref(), Some("category"));
        assert_eq!(write.values(), [json!("News")]);

        let none = posts(&[], &["category", "category_id"]);
        let mut write = WriteSet::new(&none);
        assert!(write.set_preferred(&[("category_id", json!(3))]).is_none());
        assert!(write.is_empty());
    }

    #[test]
    fn coerces_values_for_storage() {
        assert_eq!(coerce(json!(false), Coerce::Flag), json!(0));
        assert_eq!(coerce(json!("on"), Coerce::Flag), json!(1));
        assert_eq!(coerce(json!(2), Coerce::Flag), json!(1));
        assert_eq!(coerce(json!(["rust", " web "]), Coerce::CommaList), json!("rust, web"));
        assert_eq!(coerce(json!(["React", "Node"]), Coerce::JsonText), json!("[\"React\",\"Node\"]"));
        assert_eq!(coerce(json!("React, Node"), Coerce::JsonText), json!("[\"React\",\"Node\"]"));
        assert_eq!(coerce(json!(true), Coerce::Plain), json!(1));
        assert_eq!(coerce(Value::Null, Coerce::JsonText), Value::Null);
    }
}
