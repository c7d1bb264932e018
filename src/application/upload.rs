//! Upload pipeline: package captured chunks into one asset and store it

use std::io::Cursor;
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::{debug, info, warn};

use crate::domain::error::SessionError;
use crate::domain::recording::{
    human_readable_size, AudioChunk, AudioFormat, PackagedAsset, PcmLayout, RecordedAsset,
    RecordingContext,
};

use super::ports::{AssetUploader, UploadError};

impl From<UploadError> for SessionError {
    fn from(err: UploadError) -> Self {
        SessionError::UploadFailed(err.to_string())
    }
}

/// Build the stored file name for a recording.
///
/// Format: `TBM_<team-slug>_<report date>_<today YYYYMMDD>.<ext>`
pub fn asset_name(context: &RecordingContext, format: AudioFormat, today: NaiveDate) -> String {
    format!(
        "TBM_{}_{}_{}.{}",
        context.team_slug(),
        context.date().format("%Y-%m-%d"),
        today.format("%Y%m%d"),
        format.extension()
    )
}

/// Join chunks into one payload for `format`.
///
/// Container formats are already framed and are concatenated as-is.
/// `wav` chunks carry raw s16le PCM and get a RIFF header.
pub fn package_chunks(
    chunks: &[AudioChunk],
    format: AudioFormat,
    layout: PcmLayout,
) -> Result<Vec<u8>, UploadError> {
    let mut raw = Vec::with_capacity(chunks.iter().map(AudioChunk::len).sum());
    for chunk in chunks {
        raw.extend_from_slice(chunk.data());
    }

    match format {
        AudioFormat::WebmOpus | AudioFormat::OggOpus => Ok(raw),
        AudioFormat::Wav => encode_wav(&raw, layout),
    }
}

fn encode_wav(pcm: &[u8], layout: PcmLayout) -> Result<Vec<u8>, UploadError> {
    let spec = WavSpec {
        channels: layout.channels,
        sample_rate: layout.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(pcm.len() + 44));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| UploadError::RequestFailed(format!("WAV packaging failed: {}", e)))?;
        for pair in pcm.chunks_exact(2) {
            writer
                .write_sample(i16::from_le_bytes([pair[0], pair[1]]))
                .map_err(|e| UploadError::RequestFailed(format!("WAV packaging failed: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| UploadError::RequestFailed(format!("WAV packaging failed: {}", e)))?;
    }
    Ok(cursor.into_inner())
}

/// Everything the pipeline needs from a session about to be saved
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub context: RecordingContext,
    pub chunks: Vec<AudioChunk>,
    pub format: AudioFormat,
    pub layout: PcmLayout,
}

/// Finalizes chunks into one asset and uploads it.
///
/// Never retries on its own: a failed upload is reported once and the
/// caller decides whether to try again.
pub struct UploadPipeline {
    uploader: Arc<dyn AssetUploader>,
    max_upload_bytes: u64,
}

impl UploadPipeline {
    pub fn new(uploader: Arc<dyn AssetUploader>, max_upload_bytes: u64) -> Self {
        Self {
            uploader,
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Package a save request, rejecting it when above the size ceiling
    pub fn package(&self, request: &SaveRequest, today: NaiveDate) -> Result<PackagedAsset, UploadError> {
        let data = package_chunks(&request.chunks, request.format, request.layout)?;
        let size = data.len() as u64;
        if size > self.max_upload_bytes {
            warn!(size, limit = self.max_upload_bytes, "recording exceeds upload ceiling");
            return Err(UploadError::TooLarge {
                size,
                limit: self.max_upload_bytes,
            });
        }

        Ok(PackagedAsset {
            name: asset_name(&request.context, request.format, today),
            format: request.format,
            data,
        })
    }

    /// Package and upload, returning the stored asset
    pub async fn save(&self, request: &SaveRequest) -> Result<RecordedAsset, UploadError> {
        let packaged = self.package(request, Local::now().date_naive())?;
        let size = packaged.size_bytes() as u64;
        info!(
            name = %packaged.name,
            size = %human_readable_size(size),
            "uploading recording"
        );

        let receipt = self.uploader.upload(&packaged).await?;
        debug!(url = %receipt.url, "upload accepted");

        Ok(RecordedAsset {
            url: receipt.url,
            name: receipt.name.unwrap_or(packaged.name),
            size: if receipt.size > 0 { receipt.size } else { size },
            recorded_at: Utc::now(),
        })
    }
}
