//! Microphone capture using cpal
//!
//! Produces mono s16le PCM at 16kHz. Devices without a 16kHz mode are
//! opened at their lowest rate and resampled. Only the `wav` container can
//! be produced.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BuildStreamError, SampleFormat, SampleRate, StreamConfig};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::application::ports::{select_format, CaptureDevice, CaptureError, CaptureHandle};
use crate::domain::recording::{AudioChunk, AudioFormat, PcmLayout};

use super::resample::PcmResampler;

/// Preferred capture rate for speech
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Formats this adapter can produce
const SUPPORTED_FORMATS: [AudioFormat; 1] = [AudioFormat::Wav];

/// State shared between the adapter and the stream callback
struct SharedBuffer {
    samples: StdMutex<Vec<i16>>,
    /// Set when the device runs at another rate than 16kHz
    resampler: StdMutex<Option<PcmResampler>>,
    /// Gate for the callback; the stream keeps running while paused
    capturing: AtomicBool,
    /// Cleared by the stream error callback
    alive: AtomicBool,
}

impl SharedBuffer {
    fn new() -> Self {
        Self {
            samples: StdMutex::new(Vec::new()),
            resampler: StdMutex::new(None),
            capturing: AtomicBool::new(false),
            alive: AtomicBool::new(true),
        }
    }

    fn push(&self, mono: &[i16]) {
        if !self.capturing.load(Ordering::SeqCst) {
            return;
        }
        if let Ok(mut buffer) = self.samples.lock() {
            buffer.extend_from_slice(mono);
        }
    }

    /// Drain buffered samples as one s16le chunk at the target rate.
    /// `flush` also emits what the resampler is still holding.
    fn drain(&self, flush: bool) -> Result<Option<AudioChunk>, CaptureError> {
        let samples = match self.samples.lock() {
            Ok(mut buffer) => std::mem::take(&mut *buffer),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        let mut resampler = self
            .resampler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let samples = match resampler.as_mut() {
            Some(resampler) if flush => resampler.flush(&samples)?,
            Some(resampler) => resampler.process(&samples)?,
            None => samples,
        };

        if samples.is_empty() {
            return Ok(None);
        }
        let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        Ok(Some(AudioChunk::new(bytes)))
    }
}

/// An opened device. Dropping `shutdown` ends the owner thread, which
/// drops the stream.
struct ActiveCapture {
    id: u64,
    buffer: Arc<SharedBuffer>,
    shutdown: mpsc::Sender<()>,
}

/// Capture device backed by the default cpal input.
///
/// `cpal::Stream` is not `Send`, so each opened stream lives on its own
/// owner thread; the adapter only shares the sample buffer with it.
pub struct CpalCaptureDevice {
    active: StdMutex<Option<ActiveCapture>>,
    next_id: AtomicU64,
}

impl CpalCaptureDevice {
    pub fn new() -> Self {
        Self {
            active: StdMutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    fn active(&self) -> std::sync::MutexGuard<'_, Option<ActiveCapture>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn buffer_for(&self, handle: &CaptureHandle) -> Result<Arc<SharedBuffer>, CaptureError> {
        match self.active().as_ref() {
            Some(active) if active.id == handle.id => Ok(Arc::clone(&active.buffer)),
            _ => Err(CaptureError::UnknownHandle(handle.id)),
        }
    }

    fn live_buffer(&self, handle: &CaptureHandle) -> Result<Arc<SharedBuffer>, CaptureError> {
        let buffer = self.buffer_for(handle)?;
        if !buffer.alive.load(Ordering::SeqCst) {
            return Err(CaptureError::DeviceLost("input stream stopped".into()));
        }
        Ok(buffer)
    }

    /// Get the default input device
    fn get_input_device() -> Result<cpal::Device, CaptureError> {
        let host = cpal::default_host();
        host.default_input_device().ok_or(CaptureError::NoAudioDevice)
    }

    /// Pick an i16 or f32 config, preferring fewer channels and 16kHz
    fn get_input_config(device: &cpal::Device) -> Result<(StreamConfig, SampleFormat), CaptureError> {
        let supported_configs = device
            .supported_input_configs()
            .map_err(|e| CaptureError::StartFailed(format!("Failed to get configs: {}", e)))?;

        let mut best_config: Option<cpal::SupportedStreamConfigRange> = None;
        for config in supported_configs {
            if config.sample_format() != SampleFormat::I16
                && config.sample_format() != SampleFormat::F32
            {
                continue;
            }

            let includes_target = config.min_sample_rate().0 <= TARGET_SAMPLE_RATE
                && config.max_sample_rate().0 >= TARGET_SAMPLE_RATE;

            let is_better = match &best_config {
                None => true,
                Some(current) => {
                    let fewer_channels = config.channels() < current.channels();
                    let better_rate =
                        includes_target && current.min_sample_rate().0 > TARGET_SAMPLE_RATE;
                    fewer_channels || better_rate
                }
            };
            if is_better {
                best_config = Some(config);
            }
        }

        let range = best_config
            .ok_or_else(|| CaptureError::StartFailed("No suitable input config found".into()))?;

        let sample_rate = if range.min_sample_rate().0 <= TARGET_SAMPLE_RATE
            && range.max_sample_rate().0 >= TARGET_SAMPLE_RATE
        {
            SampleRate(TARGET_SAMPLE_RATE)
        } else {
            range.min_sample_rate()
        };

        let sample_format = range.sample_format();
        let config = StreamConfig {
            channels: range.channels(),
            sample_rate,
            buffer_size: cpal::BufferSize::Default,
        };
        Ok((config, sample_format))
    }

    /// Average interleaved frames down to one channel
    fn mix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
        if channels <= 1 {
            return samples.to_vec();
        }
        samples
            .chunks(channels as usize)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    }

    fn map_build_error(err: BuildStreamError) -> CaptureError {
        match err {
            BuildStreamError::DeviceNotAvailable => CaptureError::NoAudioDevice,
            other => {
                let message = other.to_string();
                let lower = message.to_lowercase();
                if lower.contains("permission") || lower.contains("denied") {
                    CaptureError::PermissionDenied
                } else {
                    CaptureError::StartFailed(message)
                }
            }
        }
    }

    /// Open the device and play the stream on the calling thread
    fn open_stream(buffer: &Arc<SharedBuffer>) -> Result<(cpal::Stream, PcmLayout), CaptureError> {
        let device = Self::get_input_device()?;
        let (config, sample_format) = Self::get_input_config(&device)?;
        let channels = config.channels;
        let device_rate = config.sample_rate.0;
        if device_rate != TARGET_SAMPLE_RATE {
            debug!(device_rate, "resampling capture to 16kHz");
            let resampler = PcmResampler::new(device_rate, TARGET_SAMPLE_RATE)?;
            *buffer
                .resampler
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(resampler);
        }
        let layout = PcmLayout {
            sample_rate: TARGET_SAMPLE_RATE,
            channels: 1,
        };

        let on_error = {
            let buffer = Arc::clone(buffer);
            move |err: cpal::StreamError| {
                warn!(error = %err, "audio stream error");
                buffer.alive.store(false, Ordering::SeqCst);
            }
        };

        let stream = match sample_format {
            SampleFormat::I16 => {
                let buffer = Arc::clone(buffer);
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _: &cpal::InputCallbackInfo| {
                        buffer.push(&Self::mix_to_mono(data, channels));
                    },
                    on_error,
                    None,
                )
            }
            SampleFormat::F32 => {
                let buffer = Arc::clone(buffer);
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        let converted: Vec<i16> =
                            data.iter().map(|&s| (s * 32767.0) as i16).collect();
                        buffer.push(&Self::mix_to_mono(&converted, channels));
                    },
                    on_error,
                    None,
                )
            }
            _ => {
                return Err(CaptureError::StartFailed(
                    "Unsupported sample format".into(),
                ))
            }
        }
        .map_err(Self::map_build_error)?;

        stream
            .play()
            .map_err(|e| CaptureError::StartFailed(e.to_string()))?;

        Ok((stream, layout))
    }
}

impl Default for CpalCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CaptureDevice for CpalCaptureDevice {
    async fn acquire(&self, preferences: &[AudioFormat]) -> Result<CaptureHandle, CaptureError> {
        let format = select_format(preferences, &SUPPORTED_FORMATS).ok_or_else(|| {
            CaptureError::UnsupportedFormat(
                preferences
                    .iter()
                    .map(AudioFormat::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        })?;

        let in_use = self.active().is_some();
        if in_use {
            return Err(CaptureError::StartFailed("microphone already in use".into()));
        }

        let buffer = Arc::new(SharedBuffer::new());
        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let thread_buffer = Arc::clone(&buffer);
        std::thread::spawn(move || match Self::open_stream(&thread_buffer) {
            Ok((stream, layout)) => {
                if ready_tx.send(Ok(layout)).is_err() {
                    return;
                }
                // Park until the sender side is dropped
                let _ = shutdown_rx.recv();
                drop(stream);
                debug!("capture stream closed");
            }
            Err(err) => {
                let _ = ready_tx.send(Err(err));
            }
        });

        let layout = ready_rx
            .await
            .map_err(|_| CaptureError::StartFailed("capture thread exited".into()))??;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut active = self.active();
        if active.is_some() {
            return Err(CaptureError::StartFailed("microphone already in use".into()));
        }
        *active = Some(ActiveCapture {
            id,
            buffer,
            shutdown: shutdown_tx,
        });
        info!(sample_rate = layout.sample_rate, "microphone acquired");

        Ok(CaptureHandle { id, format, layout })
    }

    fn start(&self, handle: &CaptureHandle) -> Result<(), CaptureError> {
        let buffer = self.live_buffer(handle)?;
        buffer.capturing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn take_chunk(&self, handle: &CaptureHandle) -> Result<Option<AudioChunk>, CaptureError> {
        let buffer = self.live_buffer(handle)?;
        buffer.drain(false)
    }

    fn pause(&self, handle: &CaptureHandle) -> Result<Option<AudioChunk>, CaptureError> {
        let buffer = self.buffer_for(handle)?;
        buffer.capturing.store(false, Ordering::SeqCst);
        buffer.drain(true)
    }

    fn resume(&self, handle: &CaptureHandle) -> Result<(), CaptureError> {
        self.start(handle)
    }

    fn stop(&self, handle: &CaptureHandle) -> Result<Option<AudioChunk>, CaptureError> {
        let tail = self.pause(handle)?;
        self.release(handle);
        Ok(tail)
    }

    fn release(&self, handle: &CaptureHandle) {
        let mut active = self.active();
        if active.as_ref().is_some_and(|a| a.id == handle.id) {
            if let Some(capture) = active.take() {
                capture.buffer.capturing.store(false, Ordering::SeqCst);
                drop(capture.shutdown);
                info!("microphone released");
            }
        }
    }
}
