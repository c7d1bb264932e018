//! Header control bar: the always-visible session control

use std::sync::Arc;

use crate::application::{SessionController, SessionSnapshot};
use crate::domain::error::SessionError;
use crate::domain::recording::{format_clock, RecordingContext};
use crate::domain::session::SessionStatus;

/// Controls the header can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAction {
    Start,
    Pause,
    Resume,
    Save,
    Retry,
    Discard,
    Acknowledge,
}

impl HeaderAction {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Start => "Start recording",
            Self::Pause => "Pause",
            Self::Resume => "Resume",
            Self::Save => "Save",
            Self::Retry => "Retry save",
            Self::Discard => "Discard",
            Self::Acknowledge => "Done",
        }
    }

    /// Key bound to the action in the interactive terminal
    pub const fn key(&self) -> char {
        match self {
            Self::Start => 'b',
            Self::Pause => 'p',
            Self::Resume => 'r',
            Self::Save | Self::Retry => 's',
            Self::Discard => 'd',
            Self::Acknowledge => 'o',
        }
    }

    /// Discarding is irreversible and needs explicit confirmation
    pub const fn needs_confirmation(&self) -> bool {
        matches!(self, Self::Discard)
    }
}

/// What the header shows for one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderView {
    pub status: SessionStatus,
    pub line: String,
    pub actions: Vec<HeaderAction>,
    /// Show a spinner instead of a static badge
    pub busy: bool,
}

/// Compute the header view. Pure; re-run on every published snapshot.
pub fn render(snapshot: &SessionSnapshot, can_start: bool) -> HeaderView {
    let clock = format_clock(snapshot.duration_secs);
    let bound = snapshot
        .context
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();

    let (line, actions, busy) = match snapshot.status {
        SessionStatus::Idle if snapshot.acquiring => {
            ("Waiting for the microphone...".to_string(), vec![], true)
        }
        SessionStatus::Idle if can_start => {
            ("Ready to record".to_string(), vec![HeaderAction::Start], false)
        }
        SessionStatus::Idle => (
            "Open a TBM report to record".to_string(),
            vec![],
            false,
        ),
        SessionStatus::Recording => (
            format!("REC {} | {}", clock, bound),
            vec![HeaderAction::Pause, HeaderAction::Save, HeaderAction::Discard],
            false,
        ),
        SessionStatus::Paused => {
            let mut actions = Vec::with_capacity(3);
            if !snapshot.at_limit() {
                actions.push(HeaderAction::Resume);
            }
            actions.extend([HeaderAction::Save, HeaderAction::Discard]);
            (format!("Paused {} | {}", clock, bound), actions, false)
        }
        SessionStatus::Saving => (format!("Saving {} recording...", clock), vec![], true),
        SessionStatus::Success => {
            let name = snapshot
                .asset
                .as_ref()
                .map(|a| a.name.as_str())
                .unwrap_or("recording");
            (format!("Saved {}", name), vec![HeaderAction::Acknowledge], false)
        }
        SessionStatus::Error => (
            format!(
                "Save failed: {}",
                snapshot.save_error.as_deref().unwrap_or("unknown error")
            ),
            vec![HeaderAction::Retry, HeaderAction::Discard],
            false,
        ),
    };

    HeaderView {
        status: snapshot.status,
        line,
        actions,
        busy,
    }
}

/// The only surface allowed to start a session.
///
/// Holds the context supplied by whichever page is displayed; owns no
/// session state.
pub struct HeaderControlBar {
    session: Arc<dyn SessionController>,
    page_context: Option<RecordingContext>,
}

impl HeaderControlBar {
    pub fn new(session: Arc<dyn SessionController>) -> Self {
        Self {
            session,
            page_context: None,
        }
    }

    /// Called by the hosting page when it gains or loses a team/date
    pub fn set_page_context(&mut self, context: Option<RecordingContext>) {
        self.page_context = context;
    }

    pub fn page_context(&self) -> Option<&RecordingContext> {
        self.page_context.as_ref()
    }

    /// The hosting page has supplied a valid context
    pub fn can_start_recording(&self) -> bool {
        self.page_context.is_some()
    }

    pub fn view(&self) -> HeaderView {
        render(&self.session.snapshot(), self.can_start_recording())
    }

    /// Perform `action`. Discard is refused unless `confirmed`.
    ///
    /// # Returns
    /// Whether the session changed
    pub async fn invoke(&self, action: HeaderAction, confirmed: bool) -> Result<bool, SessionError> {
        match action {
            HeaderAction::Start => self
                .session
                .start(self.page_context.clone())
                .await
                .map(|_| true),
            HeaderAction::Pause => self.session.pause(),
            HeaderAction::Resume => self.session.resume().await,
            HeaderAction::Save | HeaderAction::Retry => self.session.save(),
            HeaderAction::Discard if confirmed => Ok(self.session.discard()),
            HeaderAction::Discard => Ok(false),
            HeaderAction::Acknowledge => Ok(self.session.acknowledge()),
        }
    }
}
