//! Inline panel embedded in one TBM report page

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::application::ports::{AssetUploader, CaptureDevice};
use crate::application::{SessionController, SessionSnapshot};
use crate::domain::error::SessionError;
use crate::domain::recording::{format_clock, AudioFormat, RecordedAsset, RecordingContext};
use crate::domain::session::SessionStatus;

use super::local_clip::LocalClipRecorder;

/// How the shared session relates to the report this panel sits in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelStatus {
    NoRecording,
    ThisReport {
        status: SessionStatus,
        duration_secs: u64,
    },
    OtherReport {
        context: RecordingContext,
        status: SessionStatus,
    },
}

impl PanelStatus {
    pub fn describe(snapshot: &SessionSnapshot, report: &RecordingContext) -> Self {
        match &snapshot.context {
            None => Self::NoRecording,
            Some(context) if context == report => Self::ThisReport {
                status: snapshot.status,
                duration_secs: snapshot.duration_secs,
            },
            Some(context) => Self::OtherReport {
                context: context.clone(),
                status: snapshot.status,
            },
        }
    }

    /// One line of status text for the panel
    pub fn text(&self) -> String {
        match self {
            Self::NoRecording => "No recording in progress. Use the header to start one.".into(),
            Self::ThisReport {
                status,
                duration_secs,
            } => {
                let clock = format_clock(*duration_secs);
                match status {
                    SessionStatus::Recording => format!("Recording this briefing ({})", clock),
                    SessionStatus::Paused => format!("Recording paused at {}", clock),
                    SessionStatus::Saving => "Saving this briefing's recording...".into(),
                    SessionStatus::Success => "Recording saved and ready to attach".into(),
                    SessionStatus::Error => "Saving failed. Retry from the header.".into(),
                    SessionStatus::Idle => "No recording in progress.".into(),
                }
            }
            Self::OtherReport { context, status } => {
                format!("Another TBM is {}: {}", status, context)
            }
        }
    }
}

/// Reflective view of the shared session for one report, plus the
/// report's own local clip recorder.
pub struct InlinePanel {
    session: Arc<dyn SessionController>,
    report: RecordingContext,
    clip: LocalClipRecorder,
}

impl InlinePanel {
    pub fn new(
        report: RecordingContext,
        session: Arc<dyn SessionController>,
        device: Arc<dyn CaptureDevice>,
        formats: Vec<AudioFormat>,
    ) -> Self {
        let clip = LocalClipRecorder::new("audio_note", device, Arc::clone(&session), formats);
        Self {
            session,
            report,
            clip,
        }
    }

    pub fn report(&self) -> &RecordingContext {
        &self.report
    }

    pub fn status(&self) -> PanelStatus {
        PanelStatus::describe(&self.session.snapshot(), &self.report)
    }

    pub fn status_text(&self) -> String {
        self.status().text()
    }

    /// Asset saved for this report, if the shared session just finished one
    pub fn attachable_asset(&self) -> Option<RecordedAsset> {
        let snapshot = self.session.snapshot();
        if snapshot.status == SessionStatus::Success && snapshot.is_bound_to(&self.report) {
            snapshot.asset
        } else {
            None
        }
    }

    pub fn clip(&self) -> &LocalClipRecorder {
        &self.clip
    }

    /// Stop the field clip and store it. `None` when no clip was recording.
    pub async fn save_clip(
        &self,
        uploader: &dyn AssetUploader,
    ) -> Result<Option<RecordedAsset>, SessionError> {
        let Some(clip) = self.clip.stop()? else {
            return Ok(None);
        };
        let field = clip.field.clone();
        let asset = clip.into_asset(&self.report);
        let size = asset.size_bytes() as u64;
        let receipt = uploader.upload(&asset).await?;
        info!(field = %field, url = %receipt.url, "local clip saved");

        Ok(Some(RecordedAsset {
            url: receipt.url,
            name: receipt.name.unwrap_or(asset.name),
            size: if receipt.size > 0 { receipt.size } else { size },
            recorded_at: Utc::now(),
        }))
    }
}
