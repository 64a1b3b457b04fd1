//! Upload to object storage through a presigned form.
//!
//! The presign endpoint is another service: given a file name and MIME type
//! it answers `{"url": "...", "fields": {...}}`. The file is then posted as
//! multipart form data to `url` with every field followed by the `file` part,
//! and the object's public location is `url` + `fields.key`.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::pipeline::FetchedMedia;

/// Response of the presign endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct PresignedPost {
    pub url: String,
    pub fields: BTreeMap<String, String>,
}

pub struct PresignedUploader {
    client: Client,
    endpoint: Url,
}

impl PresignedUploader {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }

    pub fn from_endpoint(endpoint: &str) -> FetchResult<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| FetchError::Upload(format!("Invalid presign endpoint {}: {}", endpoint, e)))?;
        Ok(Self::new(endpoint))
    }

    /// Ask the presign endpoint for an upload form
    pub async fn presign(&self, file_name: &str, mime_type: &str) -> FetchResult<PresignedPost> {
        tracing::debug!("Requesting presigned upload for {}", file_name);

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("file", file_name), ("fileType", mime_type)])
            .send()
            .await
            .map_err(|e| FetchError::Upload(format!("Failed to get presigned URL for upload: {}", e)))?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Presign endpoint rejected request");
            return Err(FetchError::Upload("Failed to get presigned URL for upload".to_string()));
        }

        response
            .json::<PresignedPost>()
            .await
            .map_err(|e| FetchError::Upload(format!("Invalid presign response: {}", e)))
    }

    /// Upload `media` and return the final object URL
    pub async fn upload(&self, media: FetchedMedia) -> FetchResult<String> {
        let presigned = self.presign(&media.file_name, media.mime_type).await?;

        let key = presigned
            .fields
            .get("key")
            .cloned()
            .ok_or_else(|| FetchError::Upload("Presign response is missing the object key".to_string()))?;

        let part = Part::bytes(media.data)
            .file_name(media.file_name.clone())
            .mime_str(media.mime_type)
            .map_err(|e| FetchError::Upload(format!("Invalid MIME type {}: {}", media.mime_type, e)))?;

        let form = presigned
            .fields
            .iter()
            .fold(Form::new(), |form, (name, value)| form.text(name.clone(), value.clone()))
            .part("file", part);

        tracing::info!(key = %key, "Uploading {} to storage", media.file_name);

        let response = self
            .client
            .post(&presigned.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| FetchError::Upload(format!("Failed to upload file to storage: {}", e)))?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Storage rejected upload");
            return Err(FetchError::Upload("Failed to upload file to storage".to_string()));
        }

        Ok(format!("{}{}", presigned.url, key))
    }
}
