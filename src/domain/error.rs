//! Domain error types

use thiserror::Error;

/// Error when parsing a duration string
#[derive(Debug, Clone, Error)]
#[error("Invalid duration format: \"{input}\". Expected format: <number>s, <number>m, or <number>m<number>s (e.g., 30s, 30m, 2m30s)")]
pub struct DurationParseError {
    pub input: String,
}

/// Error when a recording context cannot be built
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("Team id must be a positive number")]
    InvalidTeamId,

    #[error("Team name must not be empty")]
    EmptyTeamName,

    #[error("Invalid date: \"{0}\". Expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Error when configuration fails
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),

    #[error("Invalid config value for '{key}': {message}")]
    ValidationError { key: String, message: String },

    #[error("Config file already exists at: {0}")]
    AlreadyExists(String),
}

/// Errors surfaced by the recording session.
///
/// Every message is meant to be shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Microphone access was denied. Check the microphone permission in your system privacy settings and try again.")]
    PermissionDenied,

    #[error("No microphone is available: {0}")]
    DeviceUnavailable(String),

    #[error("The microphone stopped responding: {0}")]
    CaptureInterrupted(String),

    #[error("Saving the recording failed: {0}")]
    UploadFailed(String),

    #[error("Select a team and date before starting a recording")]
    InvalidContext,

    #[error("A recording is already in progress. Save or discard it first.")]
    SessionBusy,

    #[error("Nothing was recorded, so there is nothing to save")]
    EmptyRecording,

    #[error("Recording start was cancelled")]
    Cancelled,
}

impl SessionError {
    /// Stable identifier, used in logs and the status line
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::DeviceUnavailable(_) => "device_unavailable",
            Self::CaptureInterrupted(_) => "capture_interrupted",
            Self::UploadFailed(_) => "upload_failed",
            Self::InvalidContext => "invalid_context",
            Self::SessionBusy => "session_busy",
            Self::EmptyRecording => "empty_recording",
            Self::Cancelled => "cancelled",
        }
    }
}
