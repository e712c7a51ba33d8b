// handlers/public/mod.rs - Handlers that need no access token
//
// Read endpoints serve through the process cache; auth endpoints issue tokens.

use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::error::ApiError;
use crate::services::ServiceError;
use crate::state::AppState;

pub mod auth;
pub mod blog;
pub mod catalog;
pub mod portfolio;
pub mod revalidate;
pub mod settings;
pub mod site;

/// Serve `key` from the cache; on a miss await `load` and keep its result for `ttl`
async fn cached<Fut>(state: &AppState, key: &str, ttl: Duration, tags: &[String], load: Fut) -> Result<Value, ApiError>
where
    Fut: Future<Output = Result<Value, ServiceError>>,
{
    state
        .cache
        .get_or_load(key, ttl, tags.to_vec(), || load)
        .await
        .map_err(ApiError::from)
}

/// Move one field out of a cached object
fn take_field(value: &mut Value, field: &str) -> Value {
    value.get_mut(field).map(Value::take).unwrap_or_default()
}
