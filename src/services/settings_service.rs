use serde_json::{Map, Value};
use sqlx::mysql::MySqlPool;
use tracing::info;

use super::{ServiceError, ServiceResult};
use crate::cache::CacheInvalidator;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::record::RecordError;
use crate::database::schema::{SchemaProbe, SchemaProber};
use crate::database::SqlResult;
use crate::state::AppState;

const TABLE: &str = "settings";

/// Key/value column names, newer names first
const KEY_COLUMNS: &[&str] = &["setting_key", "key"];
const VALUE_COLUMNS: &[&str] = &["setting_value", "value"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    key: &'static str,
    value: &'static str,
}

/// Strings are stored as-is, anything else as JSON text
fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

/// JSON objects and arrays stored as text come back structured
fn decode_value(value: Value) -> Value {
    match value {
        Value::String(s) if s.starts_with('{') || s.starts_with('[') => {
            serde_json::from_str(&s).unwrap_or(Value::String(s))
        }
        other => other,
    }
}

pub struct SettingsService {
    pool: MySqlPool,
    prober: SchemaProber,
    invalidator: CacheInvalidator,
}

impl SettingsService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            prober: SchemaProber::new(state.pool.clone()),
            invalidator: state.invalidator(),
        }
    }

    async fn layout(&self) -> ServiceResult<Option<Layout>> {
        if !self.prober.table_exists(TABLE).await? {
            return Ok(None);
        }
        let candidates: Vec<&str> = KEY_COLUMNS.iter().chain(VALUE_COLUMNS).copied().collect();
        let columns = self.prober.detect_columns(TABLE, &candidates).await?;
        Ok(match (columns.first_present(KEY_COLUMNS), columns.first_present(VALUE_COLUMNS)) {
            (Some(key), Some(value)) => Some(Layout { key, value }),
            _ => None,
        })
    }

    /// Every setting as one object; empty when the table does not exist
    pub async fn get_all(&self) -> ServiceResult<Map<String, Value>> {
        let Some(layout) = self.layout().await? else {
            return Ok(Map::new());
        };

        let rows = SqlResult::new(
            format!(
                "SELECT {} AS `k`, {} AS `v` FROM `settings`",
                DatabaseManager::quote_identifier(layout.key),
                DatabaseManager::quote_identifier(layout.value)
            ),
            vec![],
        )
        .fetch_all(&self.pool)
        .await?;

        let mut settings = Map::new();
        for mut row in rows {
            if let Some(Value::String(key)) = row.remove("k") {
                let value = row.remove("v").unwrap_or(Value::Null);
                settings.insert(key, decode_value(value));
            }
        }
        Ok(settings)
    }

    /// Insert or overwrite each key; one statement per key
    pub async fn update(&self, values: Map<String, Value>) -> ServiceResult<Map<String, Value>> {
        if values.is_empty() {
            return Err(RecordError::InvalidJson("Expected at least one setting".to_string()).into());
        }
        let layout = self.layout().await?.ok_or_else(|| {
            ServiceError::Database(DatabaseError::QueryError("settings table does not exist".to_string()))
        })?;

        let key_col = DatabaseManager::quote_identifier(layout.key);
        let value_col = DatabaseManager::quote_identifier(layout.value);
        let query = format!(
            "INSERT INTO `settings` ({key_col}, {value_col}) VALUES (?, ?) \
             ON DUPLICATE KEY UPDATE {value_col} = VALUES({value_col})"
        );

        for (key, value) in &values {
            let key = key.trim();
            if key.is_empty() {
                return Err(RecordError::InvalidField {
                    field: "key".to_string(),
                    reason: "setting keys cannot be empty".to_string(),
                }
                .into());
            }
            SqlResult::new(query.as_str(), vec![Value::from(key), encode_value(value)])
                .execute(&self.pool)
                .await?;
        }
        info!(table = TABLE, keys = values.len(), "Updated settings");

        self.invalidator.invalidate_settings_cache();
        self.get_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_round_trip_through_text() {
        assert_eq!(encode_value(&json!("Studio")), json!("Studio"));
        assert_eq!(encode_value(&json!(true)), json!("true"));
        assert_eq!(encode_value(&json!({ "x": 1 })), json!("{\"x\":1}"));
        assert_eq!(decode_value(json!("{\"x\":1}")), json!({ "x": 1 }));
        assert_eq!(decode_value(json!("[not json")), json!("[not json"));
        assert_eq!(decode_value(json!("+1 555 0100")), json!("+1 555 0100"));
    }
}
