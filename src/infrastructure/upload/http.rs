//! HTTP artifact store adapter

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::fs;
use tracing::debug;

use crate::application::ports::{AssetUploader, UploadError, UploadReceipt};
use crate::domain::recording::PackagedAsset;

/// Multipart field carrying the file
const FILE_FIELD: &str = "file";

// Response types for the upload endpoint

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
    name: Option<String>,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
    message: Option<String>,
}

/// Uploads recordings as `multipart/form-data` to the artifact store
pub struct HttpAssetUploader {
    endpoint: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

impl HttpAssetUploader {
    /// Create an uploader for the given endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_token: None,
            client: reqwest::Client::new(),
        }
    }

    /// Send `Authorization: Bearer <token>` with every request
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.api_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Pull a readable message out of an error body
    fn error_message(status: StatusCode, body: &str) -> String {
        let detail = serde_json::from_str::<ErrorResponse>(body)
            .ok()
            .and_then(|e| e.error.or(e.message))
            .unwrap_or_else(|| body.trim().to_string());

        if detail.is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, detail)
        }
    }

    /// Re-fetch a stored asset and write it to `path`.
    ///
    /// # Returns
    /// Number of bytes written
    pub async fn download(&self, url: &str, path: &Path) -> Result<u64, UploadError> {
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| UploadError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(UploadError::SessionExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::ServerError(Self::error_message(status, &body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| UploadError::RequestFailed(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| UploadError::RequestFailed(e.to_string()))?;
        }
        fs::write(path, &bytes)
            .await
            .map_err(|e| UploadError::RequestFailed(format!("Failed to write {}: {}", path.display(), e)))?;

        Ok(bytes.len() as u64)
    }
}

#[async_trait]
impl AssetUploader for HttpAssetUploader {
    async fn upload(&self, asset: &PackagedAsset) -> Result<UploadReceipt, UploadError> {
        let part = Part::bytes(asset.data.clone())
            .file_name(asset.name.clone())
            .mime_str(asset.format.mime_type())
            .map_err(|e| UploadError::RequestFailed(e.to_string()))?;
        let form = Form::new().part(FILE_FIELD, part);

        debug!(endpoint = %self.endpoint, name = %asset.name, "posting recording");
        let response = self
            .authorize(self.client.post(&self.endpoint))
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::RequestFailed(e.to_string()))?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(UploadError::SessionExpired);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::ServerError(Self::error_message(status, &body)));
        }

        let response: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::ParseError(e.to_string()))?;

        if response.url.trim().is_empty() {
            return Err(UploadError::ParseError("response has no url".into()));
        }

        Ok(UploadReceipt {
            url: response.url,
            name: response.name,
            size: response.size,
        })
    }
}
