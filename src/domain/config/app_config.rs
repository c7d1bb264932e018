//! Application configuration value object

use serde::{Deserialize, Serialize};

use crate::domain::recording::{AudioFormat, Duration, DEFAULT_FORMAT_PREFERENCES};

/// Default upload ceiling in megabytes
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 100;

/// Default artifact upload endpoint
pub const DEFAULT_UPLOAD_URL: &str = "http://127.0.0.1:8080/api/files/upload";

/// Application configuration.
/// All fields are optional to support partial configs and merging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub upload_url: Option<String>,
    pub api_token: Option<String>,
    pub max_duration: Option<String>,
    pub max_upload_mb: Option<u64>,
    pub success_display: Option<String>,
    pub formats: Option<Vec<String>>,
}

impl AppConfig {
    /// Create config with default values
    pub fn defaults() -> Self {
        Self {
            upload_url: Some(DEFAULT_UPLOAD_URL.to_string()),
            api_token: None,
            max_duration: Some("30m".to_string()),
            max_upload_mb: Some(DEFAULT_MAX_UPLOAD_MB),
            success_display: Some("3s".to_string()),
            formats: Some(
                DEFAULT_FORMAT_PREFERENCES
                    .iter()
                    .map(|f| f.as_str().to_string())
                    .collect(),
            ),
        }
    }

    /// Create an empty config (all None)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Merge this config with another, where other takes precedence.
    /// Only non-None values from other will override this.
    pub fn merge(self, other: Self) -> Self {
        Self {
            upload_url: other.upload_url.or(self.upload_url),
            api_token: other.api_token.or(self.api_token),
            max_duration: other.max_duration.or(self.max_duration),
            max_upload_mb: other.max_upload_mb.or(self.max_upload_mb),
            success_display: other.success_display.or(self.success_display),
            formats: other.formats.or(self.formats),
        }
    }

    /// Get the upload endpoint, or the local default
    pub fn upload_url_or_default(&self) -> &str {
        self.upload_url.as_deref().unwrap_or(DEFAULT_UPLOAD_URL)
    }

    /// Get max_duration as parsed Duration, or default if not set/invalid
    pub fn max_duration_or_default(&self) -> Duration {
        self.max_duration
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_max_duration)
    }

    /// Get success_display as parsed Duration, or default if not set/invalid
    pub fn success_display_or_default(&self) -> Duration {
        self.success_display
            .as_ref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(Duration::default_success_display)
    }

    /// Get the upload ceiling in bytes
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.unwrap_or(DEFAULT_MAX_UPLOAD_MB) * 1024 * 1024
    }

    /// Get the container preference list; unknown entries are skipped
    pub fn formats_or_default(&self) -> Vec<AudioFormat> {
        let parsed: Vec<AudioFormat> = self
            .formats
            .as_ref()
            .map(|list| list.iter().filter_map(|s| s.parse().ok()).collect())
            .unwrap_or_default();

        if parsed.is_empty() {
            DEFAULT_FORMAT_PREFERENCES.to_vec()
        } else {
            parsed
        }
    }
}
