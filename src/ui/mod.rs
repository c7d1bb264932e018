//! Observer surfaces
//!
//! Render the shared session and call its operations. None of them owns
//! session state; each re-renders from the published snapshot.

pub mod header;
pub mod inline_panel;
pub mod local_clip;

pub use header::{render, HeaderAction, HeaderControlBar, HeaderView};
pub use inline_panel::{InlinePanel, PanelStatus};
pub use local_clip::{LocalClip, LocalClipRecorder};
