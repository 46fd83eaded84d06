use thiserror::Error;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("object is empty")]
    EmptyObject,
    #[error("object is too large, the limit is {limit} bytes")]
    TooLarge { limit: usize },
    #[error("content type `{content_type}` is not accepted by bucket `{bucket}`")]
    UnsupportedContentType {
        bucket: &'static str,
        content_type: String,
    },
    #[error("invalid object key `{0}`")]
    InvalidKey(String),
}

impl StorageError {
    /// Errors caused by the uploaded object itself rather than by the store.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::IoError(_))
    }
}
