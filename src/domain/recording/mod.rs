//! Recording value objects

pub mod audio;
pub mod context;
pub mod duration;

pub use audio::{
    human_readable_size, AudioChunk, AudioFormat, PackagedAsset, PcmLayout, RecordedAsset,
    DEFAULT_FORMAT_PREFERENCES,
};
pub use context::RecordingContext;
pub use duration::{format_clock, Duration};
