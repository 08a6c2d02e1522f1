//! Resume file lifecycle: save an uploaded PDF, turn the stored reference
//! into a retrievable URL, delete it again. Two backends exist and one is
//! chosen at startup from [`StorageConfig`].

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;

use crate::config::StorageConfig;
use crate::storage::Storage;

pub mod local;
pub mod remote;

pub use local::LocalResumeStorage;
pub use remote::RemoteResumeStorage;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ResumeError {
    #[error("unsupported content type {0}")]
    UnsupportedType(String),

    #[error("file of {0} bytes exceeds the 5 MiB limit")]
    TooLarge(usize),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// A fully buffered file as received from the client.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Rejects anything that is not a PDF of at most 5 MiB.
pub fn validate_upload(upload: &ResumeUpload) -> Result<(), ResumeError> {
    let mime = upload
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim();
    if !mime.eq_ignore_ascii_case(PDF_CONTENT_TYPE) {
        return Err(ResumeError::UnsupportedType(upload.content_type.clone()));
    }
    if upload.bytes.len() > MAX_RESUME_BYTES {
        return Err(ResumeError::TooLarge(upload.bytes.len()));
    }
    Ok(())
}

#[async_trait]
pub trait ResumeStorage: Send + Sync {
    /// Validates and stores the upload, returning the reference to persist
    /// on the candidate.
    async fn save(&self, upload: ResumeUpload) -> Result<String, ResumeError>;

    /// Produces a URL the client can fetch. May differ on every call.
    async fn resolve(&self, resume_url: &str) -> anyhow::Result<String>;

    async fn delete(&self, resume_url: &str) -> anyhow::Result<()>;
}

pub async fn from_config(cfg: &StorageConfig) -> anyhow::Result<Arc<dyn ResumeStorage>> {
    let storage: Arc<dyn ResumeStorage> = match cfg {
        StorageConfig::Local { uploads_dir } => {
            Arc::new(LocalResumeStorage::new(uploads_dir.clone()).await?)
        }
        StorageConfig::Remote(s3) => {
            let client = Arc::new(Storage::new(s3).await?);
            Arc::new(RemoteResumeStorage::new(client, s3.folder.clone()))
        }
    };
    Ok(storage)
}

fn unix_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}
