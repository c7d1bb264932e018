//! Port interfaces (traits) for external systems
//!
//! These traits define the boundaries between the application
//! and infrastructure layers.

pub mod capture;
pub mod config;
pub mod draft;
pub mod uploader;

// Re-export common types
pub use capture::{select_format, CaptureDevice, CaptureError, CaptureHandle};
pub use config::ConfigStore;
pub use draft::{DraftError, DraftSaver};
pub use uploader::{AssetUploader, UploadError, UploadReceipt};
