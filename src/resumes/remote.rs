use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;

use super::{unix_millis, validate_upload, ResumeError, ResumeStorage, ResumeUpload, PDF_CONTENT_TYPE};
use crate::storage::StorageClient;

/// Lifetime of a resolved resume link.
pub const SIGNED_URL_TTL_SECS: u64 = 60 * 60;

const SCHEME: &str = "s3://";

/// Object layouts a resume may have been stored under as upload settings
/// changed over time. Deletion tries them in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredLayout {
    /// `<folder>/<stem>`, private, extension stripped. Current uploads.
    Private,
    /// `<folder>/<stem>.pdf`
    PrivateWithExtension,
    /// `<stem>.pdf` at the bucket root.
    Legacy,
}

pub const DELETE_PLAN: [StoredLayout; 3] = [
    StoredLayout::Private,
    StoredLayout::PrivateWithExtension,
    StoredLayout::Legacy,
];

impl StoredLayout {
    fn key_for(self, stored_key: &str) -> String {
        match self {
            StoredLayout::Private => stored_key.to_string(),
            StoredLayout::PrivateWithExtension => format!("{stored_key}.pdf"),
            StoredLayout::Legacy => {
                let stem = stored_key.rsplit('/').next().unwrap_or(stored_key);
                format!("{stem}.pdf")
            }
        }
    }
}

/// Stores resumes as private objects in an S3-compatible bucket.
pub struct RemoteResumeStorage {
    client: Arc<dyn StorageClient>,
    folder: String,
}

impl RemoteResumeStorage {
    pub fn new(client: Arc<dyn StorageClient>, folder: String) -> Self {
        Self { client, folder }
    }

    fn object_key(&self, original_name: &str) -> String {
        format!("{}/{}-{}", self.folder, unix_millis(), sanitize_stem(original_name))
    }

    /// `s3://<bucket>/<key>` -> `<key>`, if the URL points into our bucket.
    fn key_of<'a>(&self, resume_url: &'a str) -> Option<&'a str> {
        let rest = resume_url.strip_prefix(SCHEME)?;
        let (bucket, key) = rest.split_once('/')?;
        (bucket == self.client.bucket() && !key.is_empty()).then_some(key)
    }
}

/// Whitespace runs become `_`, other unsafe characters become `_`, a trailing
/// `.pdf` is dropped.
fn sanitize_stem(original: &str) -> String {
    let mut out = String::with_capacity(original.len());
    let mut in_space = false;
    for c in original.trim().chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('_');
            }
            in_space = true;
            continue;
        }
        in_space = false;
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    if out.to_ascii_lowercase().ends_with(".pdf") {
        out.truncate(out.len() - 4);
    }
    if out.is_empty() {
        out.push_str("resume");
    }
    out
}

#[async_trait]
impl ResumeStorage for RemoteResumeStorage {
    async fn save(&self, upload: ResumeUpload) -> Result<String, ResumeError> {
        validate_upload(&upload)?;

        let key = self.object_key(&upload.file_name);
        self.client
            .put_object(&key, upload.bytes, PDF_CONTENT_TYPE)
            .await
            .with_context(|| format!("upload resume {key}"))?;

        tracing::debug!(%key, "resume uploaded");
        Ok(format!("{SCHEME}{}/{key}", self.client.bucket()))
    }

    async fn resolve(&self, resume_url: &str) -> anyhow::Result<String> {
        match self.key_of(resume_url) {
            Some(key) => self.client.presign_get(key, SIGNED_URL_TTL_SECS).await,
            None => Ok(resume_url.to_string()),
        }
    }

    async fn delete(&self, resume_url: &str) -> anyhow::Result<()> {
        let Some(stored_key) = self.key_of(resume_url) else {
            tracing::debug!(resume_url, "not a stored object; nothing to delete");
            return Ok(());
        };

        let mut last_err = None;
        for layout in DELETE_PLAN {
            let key = layout.key_for(stored_key);
            match self.client.delete_object(&key).await {
                Ok(()) => {
                    tracing::debug!(%key, ?layout, "resume object deleted");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(%key, ?layout, error = %e, "delete attempt failed");
                    last_err = Some(e);
                }
            }
        }

        if let Some(e) = last_err {
            tracing::error!(key = %stored_key, error = ?e, "could not delete resume object");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    use bytes::Bytes;

    use super::*;

    #[derive(Default)]
    struct FakeStorage {
        objects: Mutex<HashSet<String>>,
        delete_attempts: Mutex<Vec<String>>,
        presigned: AtomicU64,
    }

    #[async_trait]
    impl StorageClient for FakeStorage {
        fn bucket(&self) -> &str {
            "resumes"
        }
        async fn put_object(&self, k: &str, _b: Bytes, ct: &str) -> anyhow::Result<()> {
            assert_eq!(ct, PDF_CONTENT_TYPE);
            self.objects.lock().unwrap().insert(k.to_string());
            Ok(())
        }
        async fn delete_object(&self, k: &str) -> anyhow::Result<()> {
            self.delete_attempts.lock().unwrap().push(k.to_string());
            if self.objects.lock().unwrap().remove(k) {
                Ok(())
            } else {
                anyhow::bail!("no such key {k}")
            }
        }
        async fn presign_get(&self, k: &str, s: u64) -> anyhow::Result<String> {
            let n = self.presigned.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://fake.local/resumes/{k}?expires={s}&sig={n}"))
        }
    }

    fn setup() -> (Arc<FakeStorage>, RemoteResumeStorage) {
        let fake = Arc::new(FakeStorage::default());
        let storage = RemoteResumeStorage::new(fake.clone(), "referral-resumes".into());
        (fake, storage)
    }

    fn pdf(name: &str) -> ResumeUpload {
        ResumeUpload {
            file_name: name.into(),
            content_type: "application/pdf".into(),
            bytes: Bytes::from_static(b"%PDF"),
        }
    }

    #[test]
    fn sanitizes_original_file_names() {
        assert_eq!(sanitize_stem("Jane  Doe CV.pdf"), "Jane_Doe_CV");
        assert_eq!(sanitize_stem("résumé (final).PDF"), "r_sum___final_");
        assert_eq!(sanitize_stem(".pdf"), "resume");
    }

    #[test]
    fn layouts_derive_keys_from_the_stored_key() {
        let stored = "referral-resumes/1700000000000-cv";
        assert_eq!(StoredLayout::Private.key_for(stored), stored);
        assert_eq!(
            StoredLayout::PrivateWithExtension.key_for(stored),
            "referral-resumes/1700000000000-cv.pdf"
        );
        assert_eq!(StoredLayout::Legacy.key_for(stored), "1700000000000-cv.pdf");
    }

    #[tokio::test]
    async fn save_uploads_private_object_and_returns_reference() {
        let (fake, storage) = setup();
        let url = storage.save(pdf("My CV.pdf")).await.expect("save");

        assert!(url.starts_with("s3://resumes/referral-resumes/"));
        assert!(url.ends_with("-My_CV"));
        let key = storage.key_of(&url).unwrap().to_string();
        assert!(fake.objects.lock().unwrap().contains(&key));
    }

    #[tokio::test]
    async fn save_rejects_before_uploading() {
        let (fake, storage) = setup();
        let mut upload = pdf("cv.txt");
        upload.content_type = "text/plain".into();
        assert!(storage.save(upload).await.is_err());
        assert!(fake.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolve_signs_fresh_urls_for_the_same_object() {
        let (_fake, storage) = setup();
        let url = storage.save(pdf("cv.pdf")).await.unwrap();
        let key = storage.key_of(&url).unwrap().to_string();

        let first = storage.resolve(&url).await.unwrap();
        let second = storage.resolve(&url).await.unwrap();

        assert_ne!(first, second);
        for signed in [&first, &second] {
            assert!(signed.contains(&key));
            assert!(signed.contains("expires=3600"));
        }
    }

    #[tokio::test]
    async fn resolve_passes_through_foreign_urls() {
        let (_fake, storage) = setup();
        let url = "https://cdn.example.com/cv.pdf";
        assert_eq!(storage.resolve(url).await.unwrap(), url);
        assert_eq!(storage.resolve("s3://other-bucket/x").await.unwrap(), "s3://other-bucket/x");
    }

    #[tokio::test]
    async fn delete_stops_at_first_successful_layout() {
        let (fake, storage) = setup();
        let url = storage.save(pdf("cv.pdf")).await.unwrap();

        storage.delete(&url).await.unwrap();

        assert_eq!(fake.delete_attempts.lock().unwrap().len(), 1);
        assert!(fake.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_falls_back_through_historical_layouts() {
        let (fake, storage) = setup();
        fake.objects
            .lock()
            .unwrap()
            .insert("1600000000000-old.pdf".into());

        storage
            .delete("s3://resumes/referral-resumes/1600000000000-old")
            .await
            .unwrap();

        let attempts = fake.delete_attempts.lock().unwrap().clone();
        assert_eq!(
            attempts,
            vec![
                "referral-resumes/1600000000000-old",
                "referral-resumes/1600000000000-old.pdf",
                "1600000000000-old.pdf",
            ]
        );
        assert!(fake.objects.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_swallows_exhausted_plan() {
        let (fake, storage) = setup();
        storage
            .delete("s3://resumes/referral-resumes/missing")
            .await
            .expect("final failure is logged, not returned");
        assert_eq!(fake.delete_attempts.lock().unwrap().len(), DELETE_PLAN.len());
    }
}
