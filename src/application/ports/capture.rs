//! Capture device port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::error::SessionError;
use crate::domain::recording::{AudioChunk, AudioFormat, PcmLayout};

/// Capture errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Microphone access denied")]
    PermissionDenied,

    #[error("No audio input device available")]
    NoAudioDevice,

    #[error("None of the requested formats is supported: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to start capture: {0}")]
    StartFailed(String),

    #[error("Capture device lost: {0}")]
    DeviceLost(String),

    #[error("Unknown capture handle {0}")]
    UnknownHandle(u64),
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied => SessionError::PermissionDenied,
            CaptureError::NoAudioDevice => {
                SessionError::DeviceUnavailable("no input device found".to_string())
            }
            CaptureError::UnsupportedFormat(msg) | CaptureError::StartFailed(msg) => {
                SessionError::DeviceUnavailable(msg)
            }
            CaptureError::DeviceLost(msg) => SessionError::CaptureInterrupted(msg),
            CaptureError::UnknownHandle(id) => {
                SessionError::CaptureInterrupted(format!("capture handle {} is gone", id))
            }
        }
    }
}

/// Exclusive access to an opened input device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureHandle {
    pub id: u64,
    pub format: AudioFormat,
    pub layout: PcmLayout,
}

/// Pick the first preferred format the device supports
pub fn select_format(preferences: &[AudioFormat], supported: &[AudioFormat]) -> Option<AudioFormat> {
    preferences.iter().copied().find(|f| supported.contains(f))
}

/// Port for the platform audio-capture primitive.
///
/// Only `acquire` suspends; every other operation completes synchronously
/// so the session can call it inside a state transition.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Request device access and open it in the best supported format.
    ///
    /// # Arguments
    /// * `preferences` - Container formats, most preferred first
    async fn acquire(&self, preferences: &[AudioFormat]) -> Result<CaptureHandle, CaptureError>;

    /// Begin buffering captured audio
    fn start(&self, handle: &CaptureHandle) -> Result<(), CaptureError>;

    /// Drain the audio buffered since the previous drain.
    /// An error means the device was lost mid-capture.
    fn take_chunk(&self, handle: &CaptureHandle) -> Result<Option<AudioChunk>, CaptureError>;

    /// Stop buffering, keeping the device open, and flush the partial tail
    fn pause(&self, handle: &CaptureHandle) -> Result<Option<AudioChunk>, CaptureError>;

    /// Restart buffering after `pause`
    fn resume(&self, handle: &CaptureHandle) -> Result<(), CaptureError>;

    /// Stop capture, flush the partial tail and release the device
    fn stop(&self, handle: &CaptureHandle) -> Result<Option<AudioChunk>, CaptureError>;

    /// Release the device without flushing anything
    fn release(&self, handle: &CaptureHandle);
}
