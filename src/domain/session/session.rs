//! Recording session state machine

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::error::SessionError;
use crate::domain::recording::{AudioChunk, Duration, RecordedAsset, RecordingContext};

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Recording,
    Paused,
    Saving,
    Success,
    Error,
}

impl SessionStatus {
    /// Get the string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Paused => "paused",
            Self::Saving => "saving",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// Whether a capture is bound to a context (anything but idle)
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of one duration tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not recording; nothing counted
    Ignored,
    /// One second counted
    Counted,
    /// One second counted and the hard cap is reached
    LimitReached,
}

/// Result of losing the capture device mid-recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptOutcome {
    Ignored,
    /// Partial work kept; session is now paused
    Paused,
    /// Nothing captured yet; session went back to idle
    Reset,
}

/// Recording session entity.
///
/// State machine:
///   IDLE -> RECORDING (begin_recording)
///   RECORDING -> PAUSED (pause, tick at the cap, interrupt with chunks)
///   PAUSED -> RECORDING (resume)
///   RECORDING | PAUSED | ERROR -> SAVING (begin_save)
///   SAVING -> SUCCESS (complete_save)
///   SAVING -> ERROR (fail_save)
///   any -> IDLE (reset)
///
/// Every transition whose precondition does not hold is a no-op and
/// reports `false`, so concurrent callers cannot corrupt the state.
#[derive(Debug)]
pub struct Session {
    status: SessionStatus,
    context: Option<RecordingContext>,
    duration_secs: u64,
    chunks: Vec<AudioChunk>,
    asset: Option<RecordedAsset>,
    save_error: Option<String>,
    generation: u64,
    max_duration_secs: u64,
}

impl Session {
    /// Create an idle session with the given hard cap
    pub fn new(max_duration: Duration) -> Self {
        Self {
            status: SessionStatus::Idle,
            context: None,
            duration_secs: 0,
            chunks: Vec::new(),
            asset: None,
            save_error: None,
            generation: 0,
            max_duration_secs: max_duration.as_secs().max(1),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn context(&self) -> Option<&RecordingContext> {
        self.context.as_ref()
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn max_duration_secs(&self) -> u64 {
        self.max_duration_secs
    }

    pub fn chunks(&self) -> &[AudioChunk] {
        &self.chunks
    }

    pub fn captured_bytes(&self) -> u64 {
        self.chunks.iter().map(|c| c.len() as u64).sum()
    }

    pub fn asset(&self) -> Option<&RecordedAsset> {
        self.asset.as_ref()
    }

    pub fn save_error(&self) -> Option<&str> {
        self.save_error.as_deref()
    }

    /// Token identifying the current session cycle
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the hard cap has been reached
    pub fn at_limit(&self) -> bool {
        self.duration_secs >= self.max_duration_secs
    }

    /// Check whether a recording could start for `context` right now
    pub fn check_can_start(&self, context: Option<&RecordingContext>) -> Result<(), SessionError> {
        if self.status != SessionStatus::Idle {
            return Err(SessionError::SessionBusy);
        }
        if context.is_none() {
            return Err(SessionError::InvalidContext);
        }
        Ok(())
    }

    /// Transition from IDLE to RECORDING, returning the new generation
    pub fn begin_recording(
        &mut self,
        context: Option<RecordingContext>,
    ) -> Result<u64, SessionError> {
        self.check_can_start(context.as_ref())?;
        self.generation += 1;
        self.status = SessionStatus::Recording;
        self.context = context;
        self.duration_secs = 0;
        self.chunks.clear();
        self.asset = None;
        self.save_error = None;
        Ok(self.generation)
    }

    /// Append a captured chunk. Only accepted while recording.
    pub fn append_chunk(&mut self, chunk: AudioChunk) -> bool {
        if self.status != SessionStatus::Recording || chunk.is_empty() {
            return false;
        }
        self.chunks.push(chunk);
        true
    }

    /// Count one second of recording
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != SessionStatus::Recording {
            return TickOutcome::Ignored;
        }
        self.duration_secs += 1;
        if self.at_limit() {
            TickOutcome::LimitReached
        } else {
            TickOutcome::Counted
        }
    }

    /// Transition from RECORDING to PAUSED
    pub fn pause(&mut self) -> bool {
        if self.status != SessionStatus::Recording || self.chunks.is_empty() {
            return false;
        }
        self.status = SessionStatus::Paused;
        true
    }

    /// Whether `resume` would apply
    pub fn can_resume(&self) -> bool {
        self.status == SessionStatus::Paused && !self.at_limit()
    }

    /// Transition from PAUSED to RECORDING
    pub fn resume(&mut self) -> bool {
        if !self.can_resume() {
            return false;
        }
        self.status = SessionStatus::Recording;
        true
    }

    /// Transition from RECORDING, PAUSED or ERROR to SAVING.
    ///
    /// With no audio captured the session resets and `EmptyRecording` is
    /// returned.
    pub fn begin_save(&mut self) -> Result<bool, SessionError> {
        match self.status {
            SessionStatus::Recording | SessionStatus::Paused | SessionStatus::Error => {}
            _ => return Ok(false),
        }
        if self.chunks.is_empty() {
            self.reset();
            return Err(SessionError::EmptyRecording);
        }
        self.status = SessionStatus::Saving;
        self.save_error = None;
        Ok(true)
    }

    /// Transition from SAVING to SUCCESS for the matching generation
    pub fn complete_save(&mut self, generation: u64, asset: RecordedAsset) -> bool {
        if self.status != SessionStatus::Saving || self.generation != generation {
            return false;
        }
        self.status = SessionStatus::Success;
        self.asset = Some(asset);
        true
    }

    /// Transition from SAVING to ERROR for the matching generation.
    /// Chunks and context are kept so a retry needs no re-recording.
    pub fn fail_save(&mut self, generation: u64, message: impl Into<String>) -> bool {
        if self.status != SessionStatus::Saving || self.generation != generation {
            return false;
        }
        self.status = SessionStatus::Error;
        self.save_error = Some(message.into());
        true
    }

    /// Handle loss of the capture device while recording
    pub fn interrupt(&mut self) -> InterruptOutcome {
        if self.status != SessionStatus::Recording {
            return InterruptOutcome::Ignored;
        }
        if self.chunks.is_empty() {
            self.reset();
            InterruptOutcome::Reset
        } else {
            self.status = SessionStatus::Paused;
            InterruptOutcome::Paused
        }
    }

    /// Leave SUCCESS once the display window of `generation` is over
    pub fn finish_success(&mut self, generation: u64) -> bool {
        if self.status != SessionStatus::Success || self.generation != generation {
            return false;
        }
        self.reset();
        true
    }

    /// Return to IDLE from any state, dropping all captured audio.
    /// Bumps the generation so late async results are ignored.
    pub fn reset(&mut self) -> SessionStatus {
        let previous = self.status;
        self.status = SessionStatus::Idle;
        self.context = None;
        self.duration_secs = 0;
        self.chunks.clear();
        self.asset = None;
        self.save_error = None;
        self.generation += 1;
        previous
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Duration::default_max_duration())
    }
}
