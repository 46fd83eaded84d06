//! Bucketed object storage. Uploaded files land in a bucket under a generated
//! key and are reachable through a public URL.

mod error;
pub use error::{StorageError, StorageResult};

mod local;
pub use local::LocalObjectStore;

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    Avatars,
    LessonMaterials,
}

impl Bucket {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Avatars => "avatars",
            Self::LessonMaterials => "lesson-materials",
        }
    }

    pub fn accepts(&self, content_type: &str) -> bool {
        match self {
            Self::Avatars => content_type.starts_with("image/"),
            Self::LessonMaterials => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct StoredObject {
    pub bucket: Bucket,
    pub key: String,
    pub url: String,
    pub size: usize,
    pub content_type: String,
}

#[async_trait::async_trait]
pub trait ObjectStore: std::fmt::Debug + Send + Sync {
    async fn put(
        &self,
        bucket: Bucket,
        key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> StorageResult<StoredObject>;

    async fn delete(&self, bucket: Bucket, key: &str) -> StorageResult<bool>;

    fn public_url(&self, bucket: Bucket, key: &str) -> String;

    fn max_object_bytes(&self) -> usize;

    /// Inverse of `public_url`, `None` for URLs this store did not hand out.
    fn key_from_url(&self, bucket: Bucket, url: &str) -> Option<String> {
        let prefix = self.public_url(bucket, "");
        url.strip_prefix(prefix.as_str())
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}

/// Validates an upload and stores it under `<owner>/<uuid>-<file name>`.
pub async fn upload(
    store: &dyn ObjectStore,
    bucket: Bucket,
    owner: Uuid,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> StorageResult<StoredObject> {
    if bytes.is_empty() {
        return Err(StorageError::EmptyObject);
    }
    if bytes.len() > store.max_object_bytes() {
        return Err(StorageError::TooLarge {
            limit: store.max_object_bytes(),
        });
    }
    if !bucket.accepts(content_type) {
        return Err(StorageError::UnsupportedContentType {
            bucket: bucket.name(),
            content_type: content_type.to_string(),
        });
    }

    let key = object_key(owner, file_name);
    let stored = store.put(bucket, &key, content_type, bytes).await?;
    tracing::debug!("stored {} bytes as {}/{}", stored.size, bucket.name(), stored.key);
    Ok(stored)
}

/// Removes the object behind `url` after it got replaced. Failures are only logged.
pub async fn discard_replaced(store: &dyn ObjectStore, bucket: Bucket, url: Option<&str>) {
    let Some(key) = url.and_then(|url| store.key_from_url(bucket, url)) else {
        return;
    };
    if let Err(e) = store.delete(bucket, &key).await {
        crate::error::log_warn(&e);
    }
}

pub fn object_key(owner: Uuid, file_name: &str) -> String {
    format!("{}/{}-{}", owner, Uuid::new_v4(), sanitize_file_name(file_name))
}

/// Keeps `[A-Za-z0-9._-]`, everything else becomes `_`. Leading dots are dropped.
pub fn sanitize_file_name(name: &str) -> String {
    // browsers may send a full client path
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();

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

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        String::from("file")
    } else {
        cleaned.to_string()
    }
}
