//! Page-local clip recorder for a single report field
//!
//! Has its own private capture lifecycle and never touches the shared
//! session. It refuses the microphone while the shared session is busy.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};

use crate::application::ports::{CaptureDevice, CaptureHandle};
use crate::application::{package_chunks, SessionController};
use crate::domain::error::SessionError;
use crate::domain::recording::{AudioChunk, AudioFormat, PackagedAsset, RecordingContext};

/// A finished local clip, ready to attach to `field`
#[derive(Debug, Clone)]
pub struct LocalClip {
    pub field: String,
    pub format: AudioFormat,
    pub data: Vec<u8>,
}

impl LocalClip {
    /// Name the clip after its report and field
    pub fn into_asset(self, context: &RecordingContext) -> PackagedAsset {
        PackagedAsset {
            name: format!(
                "TBM_{}_{}_{}.{}",
                context.team_slug(),
                context.date().format("%Y-%m-%d"),
                self.field,
                self.format.extension()
            ),
            format: self.format,
            data: self.data,
        }
    }
}

enum ClipState {
    Idle,
    Acquiring,
    Recording(CaptureHandle),
}

/// Single-field recorder embedded in the inline panel
pub struct LocalClipRecorder {
    field: String,
    device: Arc<dyn CaptureDevice>,
    session: Arc<dyn SessionController>,
    formats: Vec<AudioFormat>,
    state: Mutex<ClipState>,
}

impl LocalClipRecorder {
    pub fn new(
        field: impl Into<String>,
        device: Arc<dyn CaptureDevice>,
        session: Arc<dyn SessionController>,
        formats: Vec<AudioFormat>,
    ) -> Self {
        Self {
            field: field.into(),
            device,
            session,
            formats,
            state: Mutex::new(ClipState::Idle),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    fn lock(&self) -> MutexGuard<'_, ClipState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_recording(&self) -> bool {
        matches!(*self.lock(), ClipState::Recording(_))
    }

    /// Acquire the microphone for this field only
    pub async fn start(&self) -> Result<(), SessionError> {
        if !self.session.is_idle() {
            return Err(SessionError::SessionBusy);
        }
        {
            let mut state = self.lock();
            if !matches!(*state, ClipState::Idle) {
                return Err(SessionError::SessionBusy);
            }
            *state = ClipState::Acquiring;
        }

        let acquired = self.device.acquire(&self.formats).await;

        let mut state = self.lock();
        if !matches!(*state, ClipState::Acquiring) {
            if let Ok(handle) = &acquired {
                self.device.release(handle);
            }
            return Err(SessionError::Cancelled);
        }
        let handle = match acquired {
            Ok(handle) => handle,
            Err(err) => {
                *state = ClipState::Idle;
                return Err(err.into());
            }
        };
        if let Err(err) = self.device.start(&handle) {
            self.device.release(&handle);
            *state = ClipState::Idle;
            return Err(err.into());
        }

        info!(field = %self.field, "local clip recording");
        *state = ClipState::Recording(handle);
        Ok(())
    }

    /// Stop and return the clip, or `None` if nothing was recording
    pub fn stop(&self) -> Result<Option<LocalClip>, SessionError> {
        let handle = {
            let mut state = self.lock();
            match std::mem::replace(&mut *state, ClipState::Idle) {
                ClipState::Recording(handle) => handle,
                other => {
                    *state = other;
                    return Ok(None);
                }
            }
        };

        let mut chunks: Vec<AudioChunk> = Vec::new();
        let drained = self.device.take_chunk(&handle);
        let tail = self.device.stop(&handle);
        if drained.is_err() || tail.is_err() {
            self.device.release(&handle);
        }
        chunks.extend(drained?);
        chunks.extend(tail?);

        if chunks.is_empty() {
            return Err(SessionError::EmptyRecording);
        }
        let data = package_chunks(&chunks, handle.format, handle.layout)?;
        debug!(field = %self.field, bytes = data.len(), "local clip finished");

        Ok(Some(LocalClip {
            field: self.field.clone(),
            format: handle.format,
            data,
        }))
    }

    /// Drop the clip and release the microphone
    pub fn cancel(&self) -> bool {
        let mut state = self.lock();
        match std::mem::replace(&mut *state, ClipState::Idle) {
            ClipState::Recording(handle) => {
                self.device.release(&handle);
                true
            }
            ClipState::Acquiring => true,
            ClipState::Idle => false,
        }
    }
}
