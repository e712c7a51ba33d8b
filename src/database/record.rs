use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row};

/// Fields owned by the database; never accepted from API input
const SYSTEM_FIELDS: &[&str] = &["id", "created_at", "updated_at"];

/// Errors that can occur while reading API input into a record
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("{0} is required")]
    MissingRequiredField(String),
    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

/// A loosely-typed row: which fields it carries depends on which columns the
/// connected database has.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create record from API input JSON, dropping database-owned fields
    pub fn from_api_input(json: Value) -> Result<Self, RecordError> {
        match json {
            Value::Object(mut map) => {
                for field in SYSTEM_FIELDS {
                    if map.remove(*field).is_some() {
                        tracing::debug!("Ignoring system field '{}' in API input", field);
                    }
                }
                Ok(Self { fields: map })
            }
            _ => Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        }
    }

    /// Convert a MySQL row into JSON values column by column
    pub fn from_row(row: &MySqlRow) -> Self {
        let mut fields = Map::new();
        for i in 0..row.len() {
            let name = row.column(i).name().to_string();
            fields.insert(name, column_value(row, i));
        }
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Trimmed, non-empty string value
    pub fn get_text(&self, key: &str) -> Option<&str> {
        self.get_str(key).map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Lenient boolean: accepts true/false, 0/1 and their string forms
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|i| i != 0),
            Value::String(s) => match s.trim() {
                "1" | "true" | "on" | "yes" => Some(true),
                "0" | "false" | "off" | "no" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn require_text(&self, key: &str) -> Result<&str, RecordError> {
        self.get_text(key)
            .ok_or_else(|| RecordError::MissingRequiredField(key.to_string()))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.fields.remove(key)
    }

    pub fn id(&self) -> Option<i64> {
        self.get_i64("id")
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.fields
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn into_json(self) -> Value {
        Value::Object(self.fields)
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

fn column_value(row: &MySqlRow, i: usize) -> Value {
    // NULL decodes as None for every type, so the first probe settles it
    if let Ok(v) = row.try_get::<Option<i64>, _>(i) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(i) {
        return Value::String(s);
    }
    if let Ok(Some(f)) = row.try_get::<Option<f64>, _>(i) {
        return serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null);
    }
    if let Ok(Some(d)) = row.try_get::<Option<BigDecimal>, _>(i) {
        return Value::String(d.to_string());
    }
    if let Ok(Some(u)) = row.try_get::<Option<u64>, _>(i) {
        return Value::from(u);
    }
    if let Ok(Some(ts)) = row.try_get::<Option<DateTime<Utc>>, _>(i) {
        return Value::String(ts.to_rfc3339());
    }
    if let Ok(Some(dt)) = row.try_get::<Option<NaiveDateTime>, _>(i) {
        return Value::String(dt.and_utc().to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<NaiveDate>, _>(i) {
        return Value::String(d.to_string());
    }
    if let Ok(Some(v)) = row.try_get::<Option<Value>, _>(i) {
        return v;
    }
    if let Ok(Some(b)) = row.try_get::<Option<Vec<u8>>, _>(i) {
        return Value::String(String::from_utf8_lossy(&b).into_owned());
    }
    Value::Null
}

/// Turn a stored list column back into a JSON array.
///
/// Accepts JSON array text (`["a","b"]`), comma-joined text (`a, b`) or an
/// array already decoded from a JSON column.
pub fn parse_list(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Array(items)) => Value::Array(items.clone()),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.starts_with('[') {
                if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(trimmed) {
                    return Value::Array(items);
                }
            }
            Value::Array(
                trimmed
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            )
        }
        _ => Value::Array(vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn api_input_drops_system_fields() {
        let record = Record::from_api_input(json!({
            "id": 9,
            "created_at": "yesterday",
            "title": "Hello",
        }))
        .unwrap();
        assert!(!record.contains("id"));
        assert!(!record.contains("created_at"));
        assert_eq!(record.get_str("title"), Some("Hello"));
    }

    #[test]
    fn api_input_must_be_object() {
        assert!(matches!(
            Record::from_api_input(json!([1, 2])),
            Err(RecordError::InvalidJson(_))
        ));
    }

    #[test]
    fn lenient_accessors() {
        let record = Record::from(
            json!({ "featured": "1", "draft": 0, "order": "12", "blank": "  ", "gone": null })
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert_eq!(record.get_bool("featured"), Some(true));
        assert_eq!(record.get_bool("draft"), Some(false));
        assert_eq!(record.get_i64("order"), Some(12));
        assert_eq!(record.get_text("blank"), None);
        assert!(record.get("gone").is_none());
        assert!(matches!(
            record.require_text("blank"),
            Err(RecordError::MissingRequiredField(f)) if f == "blank"
        ));
    }

    #[test]
    fn parses_list_columns() {
        assert_eq!(parse_list(Some(&json!("react, rust ,"))), json!(["react", "rust"]));
        assert_eq!(parse_list(Some(&json!("[\"a\",\"b\"]"))), json!(["a", "b"]));
        assert_eq!(parse_list(Some(&json!(["x"]))), json!(["x"]));
        assert_eq!(parse_list(None), json!([]));
        assert_eq!(parse_list(Some(&Value::Null)), json!([]));
    }
}
