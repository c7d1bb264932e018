//! Capability set handed to observer surfaces

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::error::SessionError;
use crate::domain::recording::{AudioFormat, RecordedAsset, RecordingContext};
use crate::domain::session::SessionStatus;

/// Read-only view of the shared session, published after every applied
/// transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub context: Option<RecordingContext>,
    pub duration_secs: u64,
    pub max_duration_secs: u64,
    pub chunk_count: usize,
    pub captured_bytes: u64,
    pub asset: Option<RecordedAsset>,
    pub save_error: Option<String>,
    /// Last user-facing message (rejections, auto-stop, interruptions)
    pub notice: Option<String>,
    pub format: Option<AudioFormat>,
    /// A start or resume is waiting on the device
    pub acquiring: bool,
    pub generation: u64,
}

impl SessionSnapshot {
    pub fn is_idle(&self) -> bool {
        self.status == SessionStatus::Idle && !self.acquiring
    }

    /// Whether the session is bound to `context`
    pub fn is_bound_to(&self, context: &RecordingContext) -> bool {
        self.context.as_ref() == Some(context)
    }

    pub fn at_limit(&self) -> bool {
        self.duration_secs >= self.max_duration_secs
    }

    /// Seconds left before capture stops on its own
    pub fn remaining_secs(&self) -> u64 {
        self.max_duration_secs.saturating_sub(self.duration_secs)
    }
}

/// Intent-level operations on the shared recording session.
///
/// Surfaces never mutate session fields; they call these and re-render
/// from [`SessionController::subscribe`]. Operations whose precondition
/// does not hold are no-ops that return `Ok(false)` / `false`.
#[async_trait]
pub trait SessionController: Send + Sync {
    /// Acquire the microphone and start recording for `context`
    async fn start(&self, context: Option<RecordingContext>) -> Result<(), SessionError>;

    fn pause(&self) -> Result<bool, SessionError>;

    async fn resume(&self) -> Result<bool, SessionError>;

    /// Stop capture and hand the recording to the upload pipeline.
    /// Also the retry operation from the error state.
    fn save(&self) -> Result<bool, SessionError>;

    /// Drop the session and everything captured. Callers confirm first.
    fn discard(&self) -> bool;

    /// Leave the success state without waiting for the display window
    fn acknowledge(&self) -> bool;

    fn snapshot(&self) -> SessionSnapshot;

    fn subscribe(&self) -> watch::Receiver<SessionSnapshot>;

    fn is_idle(&self) -> bool {
        self.snapshot().is_idle()
    }
}
