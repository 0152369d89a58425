use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ClientError;
use crate::http::ApiClient;

/// A local file waiting to be uploaded before the form that owns it saves.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingUpload {
    pub body: Bytes,
    pub content_type: String,
    pub filename: Option<String>,
}

impl PendingUpload {
    pub fn new(body: impl Into<Bytes>, content_type: &str) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.to_string(),
            filename: None,
        }
    }

    pub fn named(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    /// The given name, or `<uuid>.<ext>` derived from the MIME type.
    pub fn file_name(&self) -> String {
        match &self.filename {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!(
                "{}.{}",
                Uuid::new_v4(),
                ext_from_mime(&self.content_type).unwrap_or("bin")
            ),
        }
    }
}

/// Storage endpoint for images; answers with a public URL.
#[async_trait]
pub trait UploadClient: Send + Sync {
    async fn upload_image(&self, file: &PendingUpload) -> Result<String, ClientError>;
}

/// `POST /api/uploads/image` with a multipart `image` field.
#[derive(Clone)]
pub struct HttpUploads {
    api: ApiClient,
}

impl HttpUploads {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl UploadClient for HttpUploads {
    #[instrument(skip(self, file), fields(content_type = %file.content_type, size = file.body.len()))]
    async fn upload_image(&self, file: &PendingUpload) -> Result<String, ClientError> {
        if file.body.is_empty() {
            return Err(ClientError::Upload("file is empty".into()));
        }
        let part = Part::bytes(file.body.to_vec())
            .file_name(file.file_name())
            .mime_str(&file.content_type)
            .map_err(|e| ClientError::Upload(e.to_string()))?;
        let form = Form::new().part("image", part);

        let value: Value = self
            .api
            .post_multipart("/api/uploads/image", form)
            .await
            .map_err(|e| match e {
                ClientError::Api { message, .. } => ClientError::Upload(message),
                other => other,
            })?;
        let url = value
            .get("url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ClientError::Upload("response carried no url".into()))?;
        info!(url, "image uploaded");
        Ok(url.to_string())
    }
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
