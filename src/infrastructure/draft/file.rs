//! Local JSON draft store for the report page

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::application::ports::{DraftError, DraftSaver};
use crate::domain::recording::RecordingContext;

/// What is written for one report draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRecord {
    pub context: RecordingContext,
    pub route: String,
    pub saved_at: DateTime<Utc>,
}

/// Saves report drafts as JSON files, one per team and date
pub struct JsonDraftStore {
    dir: PathBuf,
}

impl JsonDraftStore {
    /// Store under `$XDG_DATA_HOME/tbm-recorder/drafts`
    pub fn new() -> Self {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("~/.local/share"));
        Self {
            dir: base.join("tbm-recorder").join("drafts"),
        }
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File holding the draft for `context`
    pub fn path_for(&self, context: &RecordingContext) -> PathBuf {
        self.dir.join(format!(
            "{}_{}.json",
            context.team_id(),
            context.date().format("%Y-%m-%d")
        ))
    }

    /// Read back a saved draft, if any
    pub async fn load(&self, context: &RecordingContext) -> Result<Option<DraftRecord>, DraftError> {
        let path = self.path_for(context);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| DraftError(e.to_string()))?;
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| DraftError(e.to_string()))
    }
}

impl Default for JsonDraftStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DraftSaver for JsonDraftStore {
    async fn save_draft(&self, context: &RecordingContext) -> Result<(), DraftError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DraftError(e.to_string()))?;

        let record = DraftRecord {
            context: context.clone(),
            route: context.report_route(),
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&record).map_err(|e| DraftError(e.to_string()))?;

        let path = self.path_for(context);
        fs::write(&path, json)
            .await
            .map_err(|e| DraftError(e.to_string()))?;
        debug!(path = %path.display(), "draft written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn context() -> RecordingContext {
        RecordingContext::parse(3, "Night Shift", "2025-02-01").unwrap()
    }

    #[test]
    fn path_uses_team_and_date() {
        let store = JsonDraftStore::with_dir("/tmp/drafts");
        assert_eq!(
            store.path_for(&context()),
            PathBuf::from("/tmp/drafts/3_2025-02-01.json")
        );
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonDraftStore::with_dir(dir.path().join("drafts"));

        assert!(store.load(&context()).await.unwrap().is_none());
        store.save_draft(&context()).await.unwrap();

        let record = store.load(&context()).await.unwrap().unwrap();
        assert_eq!(record.context, context());
        assert_eq!(record.route, "/tbm/3/2025-02-01");
    }
}
