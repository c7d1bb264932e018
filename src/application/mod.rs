//! Application layer - Session coordination and port interfaces
//!
//! Contains the session manager, the upload pipeline, the navigation
//! guard and the trait definitions for external system interactions.

pub mod controller;
pub mod navigation;
pub mod ports;
pub mod session_manager;
pub mod upload;

// Re-export the main entry points
pub use controller::{SessionController, SessionSnapshot};
pub use navigation::{is_report_route, normalize_route, NavigationGuard, NavigationOutcome};
pub use session_manager::{SessionConfig, SessionManager};
pub use upload::{asset_name, package_chunks, SaveRequest, UploadPipeline};
