use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::uploads::{AssetUploader, UploadFile, UploadedAsset};

/// Uploads resumes to an S3-compatible bucket (MinIO locally, AWS in production).
#[derive(Clone)]
pub struct S3AssetUploader {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_base: String,
}

impl S3AssetUploader {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_base: String) -> Self {
        Self {
            client,
            bucket,
            public_base,
        }
    }
}

/// Object key for an uploaded resume. The uuid prefix keeps names unique.
pub fn object_key(id: Uuid, file_name: &str) -> String {
    format!("resumes/{}-{}", id, sanitize_file_name(file_name))
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; everything else becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "resume.pdf".to_string()
    } else {
        cleaned
    }
}

pub fn public_url(public_base: &str, bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", public_base.trim_end_matches('/'), bucket, key)
}

#[async_trait]
impl AssetUploader for S3AssetUploader {
    async fn upload(&self, files: Vec<UploadFile>) -> Result<Vec<UploadedAsset>, AppError> {
        let mut assets = Vec::with_capacity(files.len());

        for file in files {
            let key = object_key(Uuid::new_v4(), &file.file_name);
            let content_type = file
                .content_type
                .clone()
                .unwrap_or_else(|| "application/pdf".to_string());

            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(&key)
                .body(ByteStream::from(file.data))
                .content_type(content_type)
                .send()
                .await
                .map_err(|e| AppError::Upload(format!("S3 upload failed: {e}")))?;

            info!("Uploaded resume to s3://{}/{}", self.bucket, key);
            assets.push(UploadedAsset {
                url: public_url(&self.public_base, &self.bucket, &key),
            });
        }

        Ok(assets)
    }
}
