//! Artifact upload port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::PackagedAsset;

/// Upload errors
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    #[error("Recording is {size} bytes, above the {limit} byte upload limit")]
    TooLarge { size: u64, limit: u64 },

    #[error("Your login session has expired. Sign in again, then retry the save.")]
    SessionExpired,

    #[error("Could not reach the server: {0}")]
    RequestFailed(String),

    #[error("Server rejected the upload: {0}")]
    ServerError(String),

    #[error("Unexpected server response: {0}")]
    ParseError(String),
}

/// What the artifact store reports for a stored file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub url: String,
    pub name: Option<String>,
    pub size: u64,
}

/// Port for the artifact store
#[async_trait]
pub trait AssetUploader: Send + Sync {
    /// Upload a finalized recording.
    ///
    /// # Returns
    /// Where the store put the file, or an error
    async fn upload(&self, asset: &PackagedAsset) -> Result<UploadReceipt, UploadError>;
}
