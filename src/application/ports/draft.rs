//! Draft saving port used before leaving a report page

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::recording::RecordingContext;

/// Draft save errors
#[derive(Debug, Clone, Error)]
#[error("Failed to save the report draft: {0}")]
pub struct DraftError(pub String);

/// Port for the "safe navigate" step of the report page
#[async_trait]
pub trait DraftSaver: Send + Sync {
    /// Persist the report being edited for `context` as a draft
    async fn save_draft(&self, context: &RecordingContext) -> Result<(), DraftError>;
}
