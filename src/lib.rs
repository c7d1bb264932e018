//! TBM Recorder - voice recordings for Tool-Box-Meeting safety briefings
//!
//! One recording session at a time, bound to a single TBM report (team and
//! date). The session captures microphone audio in chunks, can be paused and
//! resumed, and on save is packaged and uploaded so the report can attach it.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Recording context, session state machine, config, and errors
//! - **Application**: Session manager, upload pipeline, navigation guard, and port traits
//! - **Infrastructure**: Adapters (cpal capture, HTTP upload, XDG config, JSON drafts)
//! - **UI**: Header control bar and inline report panel, both observers of the session
//! - **CLI**: Command-line interface and the interactive record runner

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod ui;
