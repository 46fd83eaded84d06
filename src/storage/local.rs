use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use super::{Bucket, ObjectStore, StorageError, StorageResult, StoredObject};

/// Stores objects as files under `<root>/<bucket>/<key>`. The directory is
/// expected to be served at `public_url`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_url: String,
    max_object_bytes: usize,
}

impl LocalObjectStore {
    pub fn new<P: AsRef<Path>>(root: P, public_url: &str, max_object_bytes: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            public_url: public_url.trim_end_matches('/').to_string(),
            max_object_bytes,
        }
    }

    pub fn from_config(config: &crate::config::Storage) -> Self {
        Self::new(config.root(), config.public_url(), config.max_upload_bytes())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: Bucket, key: &str) -> StorageResult<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(bucket.name()).join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        bucket: Bucket,
        key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> StorageResult<StoredObject> {
        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        Ok(StoredObject {
            bucket,
            key: key.to_string(),
            url: self.public_url(bucket, key),
            size: bytes.len(),
            content_type: content_type.to_string(),
        })
    }

    async fn delete(&self, bucket: Bucket, key: &str) -> StorageResult<bool> {
        let path = self.object_path(bucket, key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, bucket: Bucket, key: &str) -> String {
        format!("{}/{}/{}", self.public_url, bucket.name(), key)
    }

    fn max_object_bytes(&self) -> usize {
        self.max_object_bytes
    }
}
