use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use rand::Rng;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{unix_millis, validate_upload, ResumeError, ResumeStorage, ResumeUpload};

/// Public path prefix the uploads directory is served under.
pub const PUBLIC_PREFIX: &str = "/uploads/";

/// Stores resumes on the local filesystem.
pub struct LocalResumeStorage {
    dir: PathBuf,
}

impl LocalResumeStorage {
    pub async fn new(dir: PathBuf) -> anyhow::Result<Self> {
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("create uploads directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    #[cfg(test)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Maps a stored `/uploads/<file>` URL back to a path inside the
    /// directory. Anything else is not ours.
    fn path_for(&self, resume_url: &str) -> Option<PathBuf> {
        let name = resume_url.strip_prefix(PUBLIC_PREFIX)?;
        let file_name = Path::new(name).file_name()?;
        if file_name != name {
            return None;
        }
        Some(self.dir.join(file_name))
    }
}

fn generated_file_name(original: &str) -> String {
    let ext = Path::new(original)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    format!("{}-{}{}", unix_millis(), suffix, ext)
}

async fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let mut file = fs::File::create(path)
        .await
        .with_context(|| format!("create {}", path.display()))?;
    file.write_all(bytes)
        .await
        .with_context(|| format!("write {}", path.display()))?;
    file.flush().await.context("flush resume")?;
    Ok(())
}

/// Removes whatever part of `path` was written if the write failed.
async fn discard_on_error(path: &Path, written: anyhow::Result<()>) -> anyhow::Result<()> {
    if written.is_err() {
        if let Err(e) = fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove partial resume");
            }
        }
    }
    written
}

#[async_trait]
impl ResumeStorage for LocalResumeStorage {
    async fn save(&self, upload: ResumeUpload) -> Result<String, ResumeError> {
        validate_upload(&upload)?;

        let name = generated_file_name(&upload.file_name);
        let path = self.dir.join(&name);
        let written = write_file(&path, &upload.bytes).await;
        discard_on_error(&path, written).await?;

        tracing::debug!(file = %name, bytes = upload.bytes.len(), "resume stored on disk");
        Ok(format!("{PUBLIC_PREFIX}{name}"))
    }

    async fn resolve(&self, resume_url: &str) -> anyhow::Result<String> {
        Ok(resume_url.to_string())
    }

    async fn delete(&self, resume_url: &str) -> anyhow::Result<()> {
        let Some(path) = self.path_for(resume_url) else {
            tracing::debug!(resume_url, "not a local upload; nothing to delete");
            return Ok(());
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "resume removed from disk");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove {}", path.display())),
        }
    }
}
