use serde_json::Value;
use sqlx::mysql::{MySql, MySqlArguments, MySqlPool, MySqlQueryResult};
use sqlx::Row;

use crate::database::manager::DatabaseError;
use crate::database::record::Record;

type MySqlQuery<'q> = sqlx::query::Query<'q, MySql, MySqlArguments>;

/// A statement plus its positional (`?`) parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub query: String,
    pub params: Vec<Value>,
}

impl SqlResult {
    pub fn new(query: impl Into<String>, params: Vec<Value>) -> Self {
        Self { query: query.into(), params }
    }

    pub fn build(&self) -> MySqlQuery<'_> {
        let mut q = sqlx::query(&self.query);
        for p in self.params.iter() {
            q = bind_param(q, p);
        }
        q
    }

    pub async fn fetch_all(&self, pool: &MySqlPool) -> Result<Vec<Record>, DatabaseError> {
        let rows = self.build().fetch_all(pool).await?;
        Ok(rows.iter().map(Record::from_row).collect())
    }

    pub async fn fetch_optional(&self, pool: &MySqlPool) -> Result<Option<Record>, DatabaseError> {
        let row = self.build().fetch_optional(pool).await?;
        Ok(row.as_ref().map(Record::from_row))
    }

    /// First column of the first row as an integer (COUNT(*) and friends)
    pub async fn fetch_count(&self, pool: &MySqlPool) -> Result<i64, DatabaseError> {
        let row = self.build().fetch_one(pool).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    pub async fn execute(&self, pool: &MySqlPool) -> Result<MySqlQueryResult, DatabaseError> {
        tracing::trace!(query = %self.query, params = self.params.len(), "executing");
        Ok(self.build().execute(pool).await?)
    }
}

fn bind_param<'q>(q: MySqlQuery<'q>, v: &'q Value) -> MySqlQuery<'q> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                q.bind(u)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s.as_str()),
        // Arrays and objects land in TEXT/JSON columns as serialized JSON
        Value::Array(_) | Value::Object(_) => q.bind(v.to_string()),
    }
}
