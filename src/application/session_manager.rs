//! Process-wide recording session coordinator
//!
//! Owns the single [`Session`], the capture handle and every background
//! task that feeds it. Transitions run under one short lock that is never
//! held across an `.await`; the only suspension points are device
//! acquisition and the upload itself.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::config::AppConfig;
use crate::domain::error::SessionError;
use crate::domain::recording::{
    format_clock, AudioFormat, Duration, PcmLayout, RecordedAsset, RecordingContext,
    DEFAULT_FORMAT_PREFERENCES,
};
use crate::domain::session::{InterruptOutcome, Session, SessionStatus, TickOutcome};

use super::controller::{SessionController, SessionSnapshot};
use super::ports::{AssetUploader, CaptureDevice, CaptureError, CaptureHandle, UploadError};
use super::upload::{SaveRequest, UploadPipeline};

/// Session manager settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Hard cap on recorded time
    pub max_duration: Duration,
    /// How long the success state stays visible before returning to idle
    pub success_display: Duration,
    /// Chunk and duration tick cadence
    pub chunk_interval: StdDuration,
    /// Container preference list, most preferred first
    pub formats: Vec<AudioFormat>,
    /// Upload ceiling in bytes
    pub max_upload_bytes: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_duration: Duration::default_max_duration(),
            success_display: Duration::default_success_display(),
            chunk_interval: StdDuration::from_secs(1),
            formats: DEFAULT_FORMAT_PREFERENCES.to_vec(),
            max_upload_bytes: AppConfig::empty().max_upload_bytes(),
        }
    }
}

impl SessionConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_duration: config.max_duration_or_default(),
            success_display: config.success_display_or_default(),
            formats: config.formats_or_default(),
            max_upload_bytes: config.max_upload_bytes(),
            ..Self::default()
        }
    }
}

struct State {
    session: Session,
    capture: Option<CaptureHandle>,
    format: Option<AudioFormat>,
    layout: PcmLayout,
    /// Generation a pending acquire was issued for
    acquiring: Option<u64>,
    notice: Option<String>,
    ticker: Option<JoinHandle<()>>,
    /// Start of the tick period in progress while recording
    period_start: Option<Instant>,
    /// Recorded time since the last counted tick, kept across pauses
    carried: StdDuration,
    closed: bool,
}

impl State {
    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    /// Stop ticking and keep the partial period for the next phase.
    /// Whole periods that have not been ticked yet are counted now.
    fn bank_partial(&mut self, period: StdDuration) {
        self.stop_ticker();
        if let Some(start) = self.period_start.take() {
            self.carried += start.elapsed();
        }
        while self.carried >= period {
            self.carried -= period;
            if self.session.tick() != TickOutcome::Counted {
                self.carried = StdDuration::ZERO;
                break;
            }
        }
    }

    /// Stop ticking and drop any partial period
    fn clear_timing(&mut self) {
        self.stop_ticker();
        self.period_start = None;
        self.carried = StdDuration::ZERO;
    }

    fn snapshot(&self) -> SessionSnapshot {
        let session = &self.session;
        SessionSnapshot {
            status: session.status(),
            context: session.context().cloned(),
            duration_secs: session.duration_secs(),
            max_duration_secs: session.max_duration_secs(),
            chunk_count: session.chunks().len(),
            captured_bytes: session.captured_bytes(),
            asset: session.asset().cloned(),
            save_error: session.save_error().map(str::to_string),
            notice: self.notice.clone(),
            format: self.format,
            acquiring: self.acquiring.is_some(),
            generation: session.generation(),
        }
    }
}

struct Inner {
    device: Arc<dyn CaptureDevice>,
    pipeline: UploadPipeline,
    config: SessionConfig,
    state: Mutex<State>,
    updates: watch::Sender<SessionSnapshot>,
}

/// The single owner of the recording session.
///
/// Cheap to clone; every clone drives the same session. Construct one per
/// process and hand clones (or `Arc<dyn SessionController>`) to surfaces.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        uploader: Arc<dyn AssetUploader>,
        config: SessionConfig,
    ) -> Self {
        let state = State {
            session: Session::new(config.max_duration),
            capture: None,
            format: None,
            layout: PcmLayout::default(),
            acquiring: None,
            notice: None,
            ticker: None,
            period_start: None,
            carried: StdDuration::ZERO,
            closed: false,
        };
        let (updates, _) = watch::channel(state.snapshot());
        let pipeline = UploadPipeline::new(uploader, config.max_upload_bytes);

        Self {
            inner: Arc::new(Inner {
                device,
                pipeline,
                config,
                state: Mutex::new(state),
                updates,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: &State) {
        self.inner.updates.send_replace(state.snapshot());
    }

    fn reject(&self, state: &mut State, err: SessionError) -> SessionError {
        debug!(kind = err.kind(), "operation rejected");
        state.notice = Some(err.to_string());
        self.publish(state);
        err
    }

    /// Context and asset of a finished save, for attaching to the report
    pub fn attachable(&self) -> Option<(RecordingContext, RecordedAsset)> {
        let state = self.lock();
        if state.session.status() != SessionStatus::Success {
            return None;
        }
        let context = state.session.context()?.clone();
        let asset = state.session.asset()?.clone();
        Some((context, asset))
    }

    /// Tear the manager down: drop any session and release the device.
    /// Later starts are refused.
    pub fn shutdown(&self) {
        self.discard();
        let mut state = self.lock();
        state.closed = true;
        info!("session manager shut down");
    }

    /// Tick every period; the first tick completes the carried partial period
    fn spawn_ticker(&self, state: &mut State, generation: u64) {
        state.stop_ticker();

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let period = self.inner.config.chunk_interval;
        let now = Instant::now();
        let first = now + period.saturating_sub(state.carried);
        state.period_start = Some(now);
        state.ticker = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(first, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                let manager = SessionManager { inner };
                if !manager.on_tick(generation) {
                    break;
                }
            }
        }));
    }

    /// Drain one chunk and count one second. Returns whether to keep ticking.
    fn on_tick(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.session.generation() != generation
            || state.session.status() != SessionStatus::Recording
        {
            return false;
        }
        let Some(handle) = state.capture.clone() else {
            return false;
        };

        match self.inner.device.take_chunk(&handle) {
            Ok(Some(chunk)) => {
                state.session.append_chunk(chunk);
            }
            Ok(None) => {}
            Err(err) => {
                self.interrupt(&mut state, &handle, err);
                return false;
            }
        }

        state.carried = StdDuration::ZERO;
        state.period_start = Some(Instant::now());
        match state.session.tick() {
            TickOutcome::LimitReached => {
                self.auto_stop(&mut state, &handle);
                false
            }
            _ => {
                self.publish(&state);
                true
            }
        }
    }

    /// Hard cap reached: flush, release the device and park in paused
    fn auto_stop(&self, state: &mut State, handle: &CaptureHandle) {
        // the caller is the ticker itself; detach instead of aborting
        state.ticker = None;
        state.period_start = None;
        state.carried = StdDuration::ZERO;
        state.capture = None;

        match self.inner.device.stop(handle) {
            Ok(Some(tail)) => {
                state.session.append_chunk(tail);
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "failed to flush final chunk"),
        }

        let limit = format_clock(state.session.max_duration_secs());
        if state.session.pause() {
            info!(limit = %limit, "maximum duration reached, recording paused");
            state.notice = Some(format!(
                "Maximum recording length of {} reached. Save or discard the recording.",
                limit
            ));
        } else {
            // paused with nothing to save or resume would be a dead end
            state.session.reset();
            state.notice = Some(format!(
                "Maximum recording length of {} reached with no audio captured.",
                limit
            ));
        }
        self.publish(state);
    }

    /// Device lost mid-recording: keep partial work as paused, else go idle
    fn interrupt(&self, state: &mut State, handle: &CaptureHandle, err: CaptureError) {
        warn!(error = %err, "capture interrupted");
        // audio since the last drain is gone, so is its time
        state.clear_timing();
        state.capture = None;
        self.inner.device.release(handle);

        let outcome = state.session.interrupt();
        let err = SessionError::from(err);
        state.notice = Some(match outcome {
            InterruptOutcome::Paused => format!("{} Recording paused; resume or save it.", err),
            _ => err.to_string(),
        });
        self.publish(state);
    }

    fn finish_upload(&self, generation: u64, result: Result<RecordedAsset, UploadError>) {
        let mut state = self.lock();
        match result {
            Ok(asset) => {
                if !state.session.complete_save(generation, asset) {
                    debug!(generation, "dropping stale upload result");
                    return;
                }
                info!("recording saved");
                state.notice = None;
                self.publish(&state);
                self.schedule_success_exit(generation);
            }
            Err(err) => {
                let err = SessionError::from(err);
                if !state.session.fail_save(generation, err.to_string()) {
                    debug!(generation, "dropping stale upload failure");
                    return;
                }
                warn!(error = %err, "recording upload failed");
                state.notice = Some(err.to_string());
                self.publish(&state);
            }
        }
    }

    fn schedule_success_exit(&self, generation: u64) {
        let weak = Arc::downgrade(&self.inner);
        let display = self.inner.config.success_display.as_std();
        tokio::spawn(async move {
            time::sleep(display).await;
            if let Some(inner) = weak.upgrade() {
                let manager = SessionManager { inner };
                let mut state = manager.lock();
                if state.session.finish_success(generation) {
                    debug!("success display window over");
                    manager.publish(&state);
                }
            }
        });
    }

    /// Complete a resume whose device had been lost while paused
    async fn reacquire(&self, ticket: u64, format: Option<AudioFormat>) -> Result<bool, SessionError> {
        let preferences = match format {
            Some(format) => vec![format],
            None => self.inner.config.formats.clone(),
        };
        let acquired = self.inner.device.acquire(&preferences).await;

        let mut state = self.lock();
        if state.acquiring != Some(ticket)
            || state.session.generation() != ticket
            || state.session.status() != SessionStatus::Paused
        {
            if let Ok(handle) = &acquired {
                self.inner.device.release(handle);
            }
            return Err(SessionError::Cancelled);
        }
        state.acquiring = None;

        let handle = match acquired {
            Ok(handle) => handle,
            Err(err) => return Err(self.reject(&mut state, err.into())),
        };
        if let Err(err) = self.inner.device.start(&handle) {
            self.inner.device.release(&handle);
            return Err(self.reject(&mut state, err.into()));
        }

        state.session.resume();
        state.layout = handle.layout;
        state.capture = Some(handle);
        state.notice = None;
        self.spawn_ticker(&mut state, ticket);
        info!("recording resumed on re-acquired device");
        self.publish(&state);
        Ok(true)
    }
}

#[async_trait]
impl SessionController for SessionManager {
    async fn start(&self, context: Option<RecordingContext>) -> Result<(), SessionError> {
        let ticket = {
            let mut state = self.lock();
            if state.closed {
                return Err(SessionError::Cancelled);
            }
            if state.acquiring.is_some() {
                return Err(self.reject(&mut state, SessionError::SessionBusy));
            }
            if context.is_none() {
                return Err(self.reject(&mut state, SessionError::InvalidContext));
            }
            // a valid start is the next action after success
            if state.session.status() == SessionStatus::Success {
                state.session.reset();
            }
            if let Err(err) = state.session.check_can_start(context.as_ref()) {
                return Err(self.reject(&mut state, err));
            }

            let ticket = state.session.generation();
            state.acquiring = Some(ticket);
            state.notice = None;
            self.publish(&state);
            ticket
        };

        debug!("acquiring capture device");
        let acquired = self.inner.device.acquire(&self.inner.config.formats).await;

        let mut state = self.lock();
        if state.acquiring != Some(ticket) || state.session.generation() != ticket {
            if let Ok(handle) = &acquired {
                self.inner.device.release(handle);
            }
            debug!("start cancelled while acquiring");
            return Err(SessionError::Cancelled);
        }
        state.acquiring = None;

        let handle = match acquired {
            Ok(handle) => handle,
            Err(err) => return Err(self.reject(&mut state, err.into())),
        };
        if let Err(err) = self.inner.device.start(&handle) {
            self.inner.device.release(&handle);
            return Err(self.reject(&mut state, err.into()));
        }

        let generation = match state.session.begin_recording(context) {
            Ok(generation) => generation,
            Err(err) => {
                self.inner.device.release(&handle);
                return Err(self.reject(&mut state, err));
            }
        };

        info!(
            context = %state.session.context().map(ToString::to_string).unwrap_or_default(),
            format = %handle.format,
            "recording started"
        );
        state.format = Some(handle.format);
        state.layout = handle.layout;
        state.capture = Some(handle);
        state.clear_timing();
        self.spawn_ticker(&mut state, generation);
        self.publish(&state);
        Ok(())
    }

    fn pause(&self) -> Result<bool, SessionError> {
        let mut state = self.lock();
        if state.session.status() != SessionStatus::Recording {
            return Ok(false);
        }
        let Some(handle) = state.capture.clone() else {
            return Ok(false);
        };

        match self.inner.device.pause(&handle) {
            Ok(Some(tail)) => {
                state.session.append_chunk(tail);
            }
            Ok(None) => {}
            Err(err) => {
                let session_err = SessionError::from(err.clone());
                self.interrupt(&mut state, &handle, err);
                return Err(session_err);
            }
        }

        if state.session.chunks().is_empty() {
            // nothing captured yet; keep recording
            if let Err(err) = self.inner.device.resume(&handle) {
                let session_err = SessionError::from(err.clone());
                self.interrupt(&mut state, &handle, err);
                return Err(session_err);
            }
            return Ok(false);
        }

        state.bank_partial(self.inner.config.chunk_interval);
        state.session.pause();
        info!(duration = state.session.duration_secs(), "recording paused");
        self.publish(&state);
        Ok(true)
    }

    async fn resume(&self) -> Result<bool, SessionError> {
        let (ticket, format) = {
            let mut state = self.lock();
            if state.session.status() != SessionStatus::Paused || state.acquiring.is_some() {
                return Ok(false);
            }
            if !state.session.can_resume() {
                state.notice = Some(format!(
                    "Maximum recording length of {} reached. Save or discard the recording.",
                    format_clock(state.session.max_duration_secs())
                ));
                self.publish(&state);
                return Ok(false);
            }

            if let Some(handle) = state.capture.clone() {
                if let Err(err) = self.inner.device.resume(&handle) {
                    warn!(error = %err, "device lost while paused, re-acquiring");
                    self.inner.device.release(&handle);
                    state.capture = None;
                }
            }

            if state.capture.is_some() {
                state.session.resume();
                state.notice = None;
                let generation = state.session.generation();
                self.spawn_ticker(&mut state, generation);
                info!("recording resumed");
                self.publish(&state);
                return Ok(true);
            }

            let ticket = state.session.generation();
            state.acquiring = Some(ticket);
            self.publish(&state);
            (ticket, state.format)
        };

        self.reacquire(ticket, format).await
    }

    fn save(&self) -> Result<bool, SessionError> {
        let mut state = self.lock();
        let status = state.session.status();
        if !matches!(
            status,
            SessionStatus::Recording | SessionStatus::Paused | SessionStatus::Error
        ) {
            return Ok(false);
        }

        if status == SessionStatus::Recording {
            state.bank_partial(self.inner.config.chunk_interval);
        } else {
            state.stop_ticker();
        }
        if let Some(handle) = state.capture.take() {
            match self.inner.device.stop(&handle) {
                Ok(Some(tail)) => {
                    state.session.append_chunk(tail);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, "failed to stop capture cleanly");
                    self.inner.device.release(&handle);
                }
            }
        }
        state.acquiring = None;

        match state.session.begin_save() {
            Ok(true) => {}
            Ok(false) => return Ok(false),
            Err(err) => return Err(self.reject(&mut state, err)),
        }

        let (Some(context), Some(format)) = (state.session.context().cloned(), state.format) else {
            state.session.reset();
            return Err(self.reject(&mut state, SessionError::InvalidContext));
        };
        let request = SaveRequest {
            context,
            chunks: state.session.chunks().to_vec(),
            format,
            layout: state.layout,
        };
        let generation = state.session.generation();
        state.notice = None;
        info!(
            chunks = request.chunks.len(),
            duration = state.session.duration_secs(),
            "saving recording"
        );
        self.publish(&state);
        drop(state);

        let manager = self.clone();
        tokio::spawn(async move {
            let result = manager.inner.pipeline.save(&request).await;
            manager.finish_upload(generation, result);
        });
        Ok(true)
    }

    fn discard(&self) -> bool {
        let mut state = self.lock();
        let pending = state.acquiring.take().is_some();
        if !pending && state.session.status() == SessionStatus::Idle {
            return false;
        }

        state.clear_timing();
        if let Some(handle) = state.capture.take() {
            self.inner.device.release(&handle);
        }
        let previous = state.session.reset();
        state.notice = None;
        info!(previous = %previous, "recording discarded");
        self.publish(&state);
        true
    }

    fn acknowledge(&self) -> bool {
        let mut state = self.lock();
        if state.session.status() != SessionStatus::Success {
            return false;
        }
        state.session.reset();
        state.notice = None;
        self.publish(&state);
        true
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.inner.updates.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.updates.subscribe()
    }
}
