use axum::extract::Multipart;

use crate::web::{WebError, WebResult};

/// Multipart form with a single `file` part.
#[derive(utoipa::ToSchema)]
#[allow(unused)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Reads the first part named `file`, other parts are skipped.
    pub async fn from_multipart(mut multipart: Multipart) -> WebResult<Self> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| WebError::user_bad_request(e.body_text()))?
        {
            if field.name() != Some("file") {
                continue;
            }

            let file_name = field.file_name().unwrap_or("file").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| WebError::user_bad_request(e.body_text()))?;

            return Ok(Self {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        }

        Err(WebError::user_bad_request("Multipart field `file` is missing."))
    }
}
