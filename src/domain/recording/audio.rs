//! Audio value objects: container formats, chunks and finished assets

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Container formats a capture device may produce, in the order the
/// application prefers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AudioFormat {
    WebmOpus,
    OggOpus,
    Wav,
}

/// Default preference list: a primary format and two fallbacks
pub const DEFAULT_FORMAT_PREFERENCES: [AudioFormat; 3] =
    [AudioFormat::WebmOpus, AudioFormat::OggOpus, AudioFormat::Wav];

impl AudioFormat {
    /// Get the MIME type string
    pub const fn mime_type(&self) -> &'static str {
        match self {
            Self::WebmOpus => "audio/webm;codecs=opus",
            Self::OggOpus => "audio/ogg;codecs=opus",
            Self::Wav => "audio/wav",
        }
    }

    /// Get the file extension
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::WebmOpus => "webm",
            Self::OggOpus => "ogg",
            Self::Wav => "wav",
        }
    }

    /// Config/CLI identifier
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WebmOpus => "webm-opus",
            Self::OggOpus => "ogg-opus",
            Self::Wav => "wav",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AudioFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "webm-opus" | "webm" => Ok(Self::WebmOpus),
            "ogg-opus" | "ogg" => Ok(Self::OggOpus),
            "wav" => Ok(Self::Wav),
            other => Err(format!(
                "Unknown audio format \"{}\". Valid formats are: webm-opus, ogg-opus, wav",
                other
            )),
        }
    }
}

/// Raw PCM layout of `Wav` chunks (signed 16-bit little endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmLayout {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for PcmLayout {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
        }
    }
}

/// One incrementally produced segment of captured audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    data: Vec<u8>,
}

impl AudioChunk {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A finalized, upload-ready recording.
#[derive(Debug, Clone)]
pub struct PackagedAsset {
    pub name: String,
    pub format: AudioFormat,
    pub data: Vec<u8>,
}

impl PackagedAsset {
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// A recording persisted in the artifact store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedAsset {
    pub url: String,
    pub name: String,
    pub size: u64,
    pub recorded_at: DateTime<Utc>,
}

/// Human-readable byte size
pub fn human_readable_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
