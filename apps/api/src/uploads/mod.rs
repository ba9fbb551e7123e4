//! Resume uploads to object storage.
//!
//! `AppState` holds an `Arc<dyn AssetUploader>`; production uses
//! [`s3::S3AssetUploader`].

pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::errors::{AppError, FieldErrors};

/// A file received from the client, held in memory until uploaded.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadFile {
    pub fn is_pdf(&self) -> bool {
        self.content_type.as_deref() == Some("application/pdf")
            || self.file_name.to_lowercase().ends_with(".pdf")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedAsset {
    pub url: String,
}

#[async_trait]
pub trait AssetUploader: Send + Sync {
    /// Uploads every file and returns one public URL per file, in order.
    /// An empty result means the upload produced nothing usable.
    async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<UploadedAsset>, AppError>;
}

/// Rejects attachments that are empty, too large, or not PDFs.
pub fn check_attachments(files: &[UploadFile], max_bytes: usize) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    for file in files {
        if file.data.is_empty() {
            errors.push("resume", format!("{} is empty", file.file_name));
        } else if file.data.len() > max_bytes {
            errors.push(
                "resume",
                format!("{} exceeds the {max_bytes} byte limit", file.file_name),
            );
        } else if !file.is_pdf() {
            errors.push("resume", format!("{} must be a PDF", file.file_name));
        }
    }
    errors.into_result(())
}

/// Returns the resume URL to store.
///
/// No files: `existing` passes through untouched. Otherwise the files are
/// uploaded and the first URL wins; an error or empty result is an upload
/// failure.
pub async fn resolve_resume(
    uploader: &dyn AssetUploader,
    files: Vec<UploadFile>,
    existing: &str,
) -> Result<String, AppError> {
    if files.is_empty() {
        return Ok(existing.to_string());
    }

    let count = files.len();
    let assets = uploader
        .upload(files)
        .await
        .map_err(|e| AppError::Upload(format!("resume upload failed: {e}")))?;

    let first = assets
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Upload("upload returned no result".to_string()))?;

    info!("Uploaded {count} resume file(s); using {}", first.url);
    Ok(first.url)
}
