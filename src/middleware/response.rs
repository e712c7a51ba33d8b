use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Wrapper for API responses that adds the `{ success: true, ... }` envelope
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    /// Envelope key for the payload: `data`, `posts`, `portfolios`, ...
    pub key: &'static str,
    pub message: Option<String>,
    pub extra: Map<String, Value>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a successful API response; success is always 200
    pub fn success(data: T) -> Self {
        Self {
            data,
            key: "data",
            message: None,
            extra: Map::new(),
        }
    }

    pub fn key(mut self, key: &'static str) -> Self {
        self.key = key;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Extra top-level envelope field, e.g. `pagination`
    pub fn field(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }
}

impl ApiResponse<()> {
    /// Envelope with only a message
    pub fn ok_message(message: impl Into<String>) -> Self {
        Self::success(()).message(message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data_value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "message": "Failed to serialize response data"
                    })),
                )
                    .into_response();
            }
        };

        let mut envelope = Map::new();
        envelope.insert("success".to_string(), Value::Bool(true));
        if let Some(message) = self.message {
            envelope.insert("message".to_string(), Value::String(message));
        }
        if !data_value.is_null() {
            envelope.insert(self.key.to_string(), data_value);
        }
        envelope.extend(self.extra);

        (StatusCode::OK, Json(Value::Object(envelope))).into_response()
    }
}

// Convenience type alias
pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn envelope_uses_custom_key_and_fields() {
        let resp = ApiResponse::success(vec![1, 2])
            .key("posts")
            .field("pagination", json!({ "page": 1 }))
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body(resp).await,
            json!({ "success": true, "posts": [1, 2], "pagination": { "page": 1 } })
        );
    }

    #[tokio::test]
    async fn message_only_envelope() {
        let resp = ApiResponse::ok_message("Deleted").into_response();
        assert_eq!(body(resp).await, json!({ "success": true, "message": "Deleted" }));
    }

    #[tokio::test]
    async fn created_records_reply_with_ok() {
        let resp = ApiResponse::success(json!({ "id": 1 })).message("Category created").into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body(resp).await,
            json!({ "success": true, "message": "Category created", "data": { "id": 1 } })
        );
    }
}
