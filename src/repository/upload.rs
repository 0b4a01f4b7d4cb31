use chrono::Utc;
use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;

use crate::model::Attachment;
use crate::store::{BackendError, StorageService};

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_BUCKET: &str = "catalogo";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("only image files can be attached (got '{0}')")]
    NotAnImage(String),
    #[error("photo is larger than 5 MB ({size} bytes)")]
    TooLarge { size: usize },
    #[error("photo storage is unavailable: {0}")]
    StorageUnavailable(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl UploadError {
    /// Rejected before any network call
    pub fn is_local(&self) -> bool {
        matches!(self, UploadError::NotAnImage(_) | UploadError::TooLarge { .. })
    }
}

/// Stores entity photos and hands back their public URLs
pub struct UploadRepository {
    storage: Arc<dyn StorageService>,
    bucket: String,
}

impl UploadRepository {
    pub fn new(storage: Arc<dyn StorageService>, bucket: impl Into<String>) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// MIME and size rules, checked without touching storage
    pub fn check(file: &Attachment) -> Result<(), UploadError> {
        if !file.content_type.starts_with("image/") {
            return Err(UploadError::NotAnImage(file.content_type.clone()));
        }
        if file.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge {
                size: file.bytes.len(),
            });
        }
        Ok(())
    }

    pub async fn upload(&self, file: &Attachment, folder: &str) -> Result<String, UploadError> {
        Self::check(file)?;
        self.ensure_bucket().await?;

        let path = format!(
            "{}/{}-{}",
            folder,
            Utc::now().timestamp_millis(),
            sanitize_file_name(&file.file_name)
        );
        self.storage
            .upload_object(&self.bucket, &path, &file.content_type, file.bytes.clone())
            .await?;

        info!("Uploaded {} ({} bytes) to {}/{}", file.file_name, file.bytes.len(), self.bucket, path);
        Ok(self.storage.public_url(&self.bucket, &path))
    }

    async fn ensure_bucket(&self) -> Result<(), UploadError> {
        match self.storage.bucket_exists(&self.bucket).await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(err) => warn!("Could not check bucket {}: {}", self.bucket, err),
        }

        self.storage.create_bucket(&self.bucket).await.map_err(|err| {
            warn!("Bucket {} could not be created: {}", self.bucket, err);
            UploadError::StorageUnavailable(err.to_string())
        })
    }
}

/// Lower-case ASCII alphanumerics, dots and dashes only
fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() {
        "photo".to_string()
    } else {
        cleaned.to_string()
    }
}
