//! Scriptable test doubles for the capture device and artifact store

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use tbm_recorder::application::ports::{
    select_format, AssetUploader, CaptureDevice, CaptureError, CaptureHandle, UploadError,
    UploadReceipt,
};
use tbm_recorder::application::{SessionConfig, SessionManager};
use tbm_recorder::domain::recording::{
    AudioChunk, AudioFormat, PackagedAsset, PcmLayout, RecordingContext,
};

pub fn context() -> RecordingContext {
    RecordingContext::parse(1, "T1", "2025-01-10").unwrap()
}

pub fn other_context() -> RecordingContext {
    RecordingContext::parse(2, "T2", "2025-01-10").unwrap()
}

#[derive(Default)]
struct DeviceScript {
    acquire_errors: VecDeque<CaptureError>,
    supported: Option<Vec<AudioFormat>>,
    lost: bool,
    silent: bool,
    fail_resume: bool,
    tail: Vec<u8>,
    open: HashSet<u64>,
    last_preferences: Vec<AudioFormat>,
}

/// Capture device that yields a fixed 4-byte chunk per drain
#[derive(Default)]
pub struct MockDevice {
    script: Mutex<DeviceScript>,
    gate: Mutex<Option<Arc<Notify>>>,
    next_id: AtomicU64,
    pub acquires: AtomicUsize,
    pub releases: AtomicUsize,
}

impl MockDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn script(&self) -> std::sync::MutexGuard<'_, DeviceScript> {
        self.script.lock().unwrap()
    }

    /// Fail the next acquire with `err`
    pub fn fail_next_acquire(&self, err: CaptureError) {
        self.script().acquire_errors.push_back(err);
    }

    pub fn support_only(&self, formats: &[AudioFormat]) {
        self.script().supported = Some(formats.to_vec());
    }

    /// Simulate the device being unplugged
    pub fn lose_device(&self) {
        self.script().lost = true;
    }

    /// Deliver no audio from later drains
    pub fn go_silent(&self) {
        self.script().silent = true;
    }

    pub fn fail_resume(&self) {
        self.script().fail_resume = true;
    }

    /// Bytes flushed by pause and stop
    pub fn set_tail(&self, tail: &[u8]) {
        self.script().tail = tail.to_vec();
    }

    /// Hold the next acquire until `open_gate`
    pub fn hold_acquire(&self) {
        *self.gate.lock().unwrap() = Some(Arc::new(Notify::new()));
    }

    /// Let a held acquire finish; later acquires are not held
    pub fn open_gate(&self) {
        if let Some(gate) = self.gate.lock().unwrap().take() {
            gate.notify_one();
        }
    }

    pub fn open_handles(&self) -> usize {
        self.script().open.len()
    }

    pub fn last_preferences(&self) -> Vec<AudioFormat> {
        self.script().last_preferences.clone()
    }

    fn tail(&self) -> Option<AudioChunk> {
        let tail = self.script().tail.clone();
        (!tail.is_empty()).then(|| AudioChunk::new(tail))
    }
}

#[async_trait]
impl CaptureDevice for MockDevice {
    async fn acquire(&self, preferences: &[AudioFormat]) -> Result<CaptureHandle, CaptureError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut script = self.script();
        script.last_preferences = preferences.to_vec();
        if let Some(err) = script.acquire_errors.pop_front() {
            return Err(err);
        }
        let supported = script
            .supported
            .clone()
            .unwrap_or_else(|| vec![AudioFormat::WebmOpus, AudioFormat::OggOpus, AudioFormat::Wav]);
        let format = select_format(preferences, &supported)
            .ok_or_else(|| CaptureError::UnsupportedFormat("mock".to_string()))?;

        script.lost = false;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        script.open.insert(id);
        Ok(CaptureHandle {
            id,
            format,
            layout: PcmLayout::default(),
        })
    }

    fn start(&self, _handle: &CaptureHandle) -> Result<(), CaptureError> {
        Ok(())
    }

    fn take_chunk(&self, _handle: &CaptureHandle) -> Result<Option<AudioChunk>, CaptureError> {
        let script = self.script();
        if script.lost {
            return Err(CaptureError::DeviceLost("unplugged".to_string()));
        }
        if script.silent {
            return Ok(None);
        }
        Ok(Some(AudioChunk::new(vec![1, 2, 3, 4])))
    }

    fn pause(&self, _handle: &CaptureHandle) -> Result<Option<AudioChunk>, CaptureError> {
        if self.script().lost {
            return Err(CaptureError::DeviceLost("unplugged".to_string()));
        }
        Ok(self.tail())
    }

    fn resume(&self, _handle: &CaptureHandle) -> Result<(), CaptureError> {
        let script = self.script();
        if script.lost || script.fail_resume {
            return Err(CaptureError::DeviceLost("unplugged".to_string()));
        }
        Ok(())
    }

    fn stop(&self, handle: &CaptureHandle) -> Result<Option<AudioChunk>, CaptureError> {
        self.script().open.remove(&handle.id);
        Ok(self.tail())
    }

    fn release(&self, handle: &CaptureHandle) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.script().open.remove(&handle.id);
    }
}

/// Artifact store that answers after `delay`
#[derive(Default)]
pub struct MockUploader {
    delay: Duration,
    failures: Mutex<VecDeque<UploadError>>,
    uploaded: Mutex<Vec<PackagedAsset>>,
    pub calls: AtomicUsize,
}

impl MockUploader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ..Self::default()
        })
    }

    /// Fail the next upload with `err`
    pub fn fail_next(&self, err: UploadError) {
        self.failures.lock().unwrap().push_back(err);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn uploaded(&self) -> Vec<PackagedAsset> {
        self.uploaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetUploader for MockUploader {
    async fn upload(&self, asset: &PackagedAsset) -> Result<UploadReceipt, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let failure = self.failures.lock().unwrap().pop_front();
        if let Some(err) = failure {
            return Err(err);
        }
        self.uploaded.lock().unwrap().push(asset.clone());
        Ok(UploadReceipt {
            url: format!("https://files.test/{}", asset.name),
            name: None,
            size: asset.size_bytes() as u64,
        })
    }
}

/// Manager over the two doubles with a 1 second tick
pub fn manager_with(
    device: &Arc<MockDevice>,
    uploader: &Arc<MockUploader>,
    config: SessionConfig,
) -> SessionManager {
    SessionManager::new(device.clone(), uploader.clone(), config)
}

pub fn manager(device: &Arc<MockDevice>, uploader: &Arc<MockUploader>) -> SessionManager {
    manager_with(device, uploader, SessionConfig::default())
}
