// handlers/admin/upload.rs - POST /api/admin/upload

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::upload::{self, StoredUpload, UploadError};

/// Multipart field names accepted for the file
const FILE_FIELDS: &[&str] = &["file", "image"];

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(err.body_text())
    } else {
        ApiError::bad_request(err.body_text())
    }
}

/// POST /api/admin/upload - Store one image, return its public path
pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> ApiResult<StoredUpload> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if !field.name().is_some_and(|name| FILE_FIELDS.contains(&name)) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let mime = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(multipart_error)?;

        let stored = upload::store(&state.config.upload, file_name.as_deref(), &mime, &data).await?;
        return Ok(ApiResponse::success(stored).message("File uploaded"));
    }

    Err(UploadError::MissingFile.into())
}
