//! Image uploads stored on local disk under a date-partitioned path.

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::config::UploadConfig;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("Only image uploads are allowed (got {0})")]
    NotAnImage(String),
    #[error("File is too large: {size} bytes (limit {limit} bytes)")]
    TooLarge { size: usize, limit: usize },
    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Where an upload ended up, as returned to the client
#[derive(Debug, Clone, Serialize)]
pub struct StoredUpload {
    /// Public URL path, e.g. `/uploads/2024/05/01/1714550000-3f2a9c01b7de.png`
    pub path: String,
    pub size: usize,
    pub mime: String,
}

pub fn validate(mime: &str, size: usize, limit: usize) -> Result<(), UploadError> {
    if size == 0 {
        return Err(UploadError::MissingFile);
    }
    if !mime.starts_with("image/") {
        return Err(UploadError::NotAnImage(mime.to_string()));
    }
    if size > limit {
        return Err(UploadError::TooLarge { size, limit });
    }
    Ok(())
}

/// Extension from the original file name when it looks sane, else from the MIME type
fn extension(mime: &str, original_name: Option<&str>) -> String {
    let from_name = original_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return ext;
    }

    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
    .to_string()
}

/// `YYYY/MM/DD/<unix-ts>-<sha256 prefix>.<ext>`
fn relative_path(now: DateTime<Utc>, data: &[u8], ext: &str) -> String {
    let digest = Sha256::digest(data);
    let prefix: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!(
        "{:04}/{:02}/{:02}/{}-{}.{}",
        now.year(),
        now.month(),
        now.day(),
        now.timestamp(),
        prefix,
        ext
    )
}

/// Validate and write one upload below `config.dir`
pub async fn store(
    config: &UploadConfig,
    original_name: Option<&str>,
    mime: &str,
    data: &[u8],
) -> Result<StoredUpload, UploadError> {
    validate(mime, data.len(), config.max_bytes)?;

    let relative = relative_path(Utc::now(), data, &extension(mime, original_name));
    let target = PathBuf::from(&config.dir).join(&relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, data).await?;

    let path = format!("{}/{}", config.public_prefix.trim_end_matches('/'), relative);
    tracing::info!(path = %path, size = data.len(), mime, "Stored upload");
    Ok(StoredUpload { path, size: data.len(), mime: mime.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn rejects_non_images_and_oversized_files() {
        assert!(validate("image/png", 10, 100).is_ok());
        assert!(matches!(validate("application/pdf", 10, 100), Err(UploadError::NotAnImage(_))));
        assert!(matches!(
            validate("image/jpeg", 101, 100),
            Err(UploadError::TooLarge { size: 101, limit: 100 })
        ));
        assert!(matches!(validate("image/png", 0, 100), Err(UploadError::MissingFile)));
    }

    #[test]
    fn picks_a_safe_extension() {
        assert_eq!(extension("image/png", Some("Logo.PNG")), "png");
        assert_eq!(extension("image/jpeg", Some("photo")), "jpg");
        assert_eq!(extension("image/webp", Some("x.../../etc")), "webp");
        assert_eq!(extension("image/x-icon", None), "bin");
    }

    #[test]
    fn paths_are_partitioned_by_date() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let path = relative_path(now, b"hello", "png");
        // sha256("hello") starts with 2cf24dba5fb0
        assert_eq!(path, format!("2024/05/01/{}-2cf24dba5fb0.png", now.timestamp()));
    }

    #[tokio::test]
    async fn stores_under_upload_dir() {
        let dir = std::env::temp_dir().join(format!("studio-cms-upload-{}", uuid::Uuid::new_v4()));
        let config = UploadConfig {
            dir: dir.to_string_lossy().into_owned(),
            public_prefix: "/uploads".to_string(),
            max_bytes: 1024,
        };

        let stored = store(&config, Some("a.png"), "image/png", b"png-bytes").await.unwrap();
        assert!(stored.path.starts_with("/uploads/"));
        assert!(stored.path.ends_with(".png"));
        assert_eq!(stored.size, 9);

        let on_disk = dir.join(stored.path.trim_start_matches("/uploads/"));
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"png-bytes");
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
