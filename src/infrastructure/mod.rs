//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with the microphone, the artifact store and local files.

pub mod capture;
pub mod config;
pub mod draft;
pub mod upload;

// Re-export adapters
pub use capture::CpalCaptureDevice;
pub use config::XdgConfigStore;
pub use draft::JsonDraftStore;
pub use upload::HttpAssetUploader;
