//! Session lifecycle integration tests over mock capture and upload

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use tokio::time::sleep;

use common::{context, manager, manager_with, other_context, MockDevice, MockUploader};
use tbm_recorder::application::ports::{CaptureError, UploadError};
use tbm_recorder::application::{SessionConfig, SessionController, SessionSnapshot};
use tbm_recorder::domain::error::SessionError;
use tbm_recorder::domain::recording::{AudioFormat, Duration};
use tbm_recorder::domain::session::SessionStatus;
use tbm_recorder::ui::{HeaderAction, HeaderControlBar, InlinePanel, PanelStatus};

fn secs(value: f64) -> StdDuration {
    StdDuration::from_secs_f64(value)
}

async fn wait_for_status(controller: &dyn SessionController, status: SessionStatus) -> SessionSnapshot {
    let mut rx = controller.subscribe();
    let snapshot = rx
        .wait_for(|s| s.status == status)
        .await
        .expect("session manager dropped");
    snapshot.clone()
}

#[tokio::test(start_paused = true)]
async fn scenario_a_record_pause_resume_save() {
    let device = MockDevice::new();
    let uploader = MockUploader::new();
    let manager = manager(&device, &uploader);

    manager.start(Some(context())).await.unwrap();
    assert_eq!(manager.snapshot().status, SessionStatus::Recording);

    sleep(secs(5.5)).await;
    assert!(manager.pause().unwrap());
    let paused = manager.snapshot();
    assert_eq!(paused.status, SessionStatus::Paused);
    assert_eq!(paused.duration_secs, 5);

    // paused time is not counted
    sleep(secs(10.0)).await;
    assert_eq!(manager.snapshot().duration_secs, 5);

    assert!(manager.resume().await.unwrap());
    assert_eq!(manager.snapshot().status, SessionStatus::Recording);
    sleep(secs(3.2)).await;

    assert!(manager.save().unwrap());
    assert_eq!(manager.snapshot().status, SessionStatus::Saving);

    let done = wait_for_status(&manager, SessionStatus::Success).await;
    assert_eq!(done.duration_secs, 8);
    assert_eq!(done.chunk_count, 8);
    let asset = done.asset.expect("asset after success");
    assert!(asset.url.starts_with("https://files.test/TBM_t1_2025-01-10_"));
    assert!(asset.url.ends_with(".webm"));
    assert_eq!(asset.size, 32);

    let (bound, attached) = manager.attachable().expect("attachable after success");
    assert_eq!(bound, context());
    assert_eq!(attached, asset);
    assert_eq!(device.open_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn partial_seconds_carry_across_pauses() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    for phase in 0..4 {
        if phase > 0 {
            assert!(manager.resume().await.unwrap());
        }
        sleep(secs(1.9)).await;
        assert!(manager.pause().unwrap());
        sleep(secs(5.0)).await;
    }

    // 4 x 1.9s = 7.6s recorded
    let snapshot = manager.snapshot();
    assert_eq!(snapshot.duration_secs, 7);
    assert_eq!(snapshot.chunk_count, 7);
}

#[tokio::test(start_paused = true)]
async fn cap_applies_to_recorded_time_across_pauses() {
    let device = MockDevice::new();
    let config = SessionConfig {
        max_duration: Duration::from_secs(3),
        ..SessionConfig::default()
    };
    let manager = manager_with(&device, &MockUploader::new(), config);

    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.6)).await;
    assert!(manager.pause().unwrap());
    assert!(manager.resume().await.unwrap());

    // 1.6s + 1.5s crosses the 3s cap
    sleep(secs(1.5)).await;
    let snapshot = manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Paused);
    assert_eq!(snapshot.duration_secs, 3);
    assert!(snapshot.at_limit());
}

#[tokio::test(start_paused = true)]
async fn scenario_b_start_without_context() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    let err = manager.start(None).await.unwrap_err();
    assert_eq!(err, SessionError::InvalidContext);

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Idle);
    assert!(snapshot.notice.is_some());
    assert_eq!(device.acquires.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn scenario_c_second_start_is_busy() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    let err = manager.start(Some(other_context())).await.unwrap_err();
    assert_eq!(err, SessionError::SessionBusy);

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Recording);
    assert_eq!(snapshot.context, Some(context()));
    assert_eq!(device.acquires.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn start_is_busy_while_paused_or_saving() {
    let device = MockDevice::new();
    let uploader = MockUploader::with_delay(secs(5.0));
    let manager = manager(&device, &uploader);

    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.5)).await;
    assert!(manager.pause().unwrap());
    assert_eq!(
        manager.start(Some(context())).await.unwrap_err(),
        SessionError::SessionBusy
    );

    assert!(manager.save().unwrap());
    assert_eq!(
        manager.start(Some(context())).await.unwrap_err(),
        SessionError::SessionBusy
    );
    assert_eq!(manager.snapshot().status, SessionStatus::Saving);
}

#[tokio::test(start_paused = true)]
async fn start_is_busy_while_another_start_acquires() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());
    device.hold_acquire();

    let first = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.start(Some(context())).await })
    };
    let mut rx = manager.subscribe();
    rx.wait_for(|s| s.acquiring).await.unwrap();

    let err = manager.start(Some(other_context())).await.unwrap_err();
    assert_eq!(err, SessionError::SessionBusy);

    device.open_gate();
    first.await.unwrap().unwrap();
    assert_eq!(manager.snapshot().context, Some(context()));
}

#[tokio::test(start_paused = true)]
async fn scenario_d_failed_upload_can_be_retried() {
    let device = MockDevice::new();
    let uploader = MockUploader::new();
    uploader.fail_next(UploadError::ServerError("HTTP 500: disk full".to_string()));
    let manager = manager(&device, &uploader);

    manager.start(Some(context())).await.unwrap();
    sleep(secs(3.5)).await;
    assert!(manager.save().unwrap());

    let failed = wait_for_status(&manager, SessionStatus::Error).await;
    let message = failed.save_error.expect("save error recorded");
    assert!(message.contains("HTTP 500"), "got: {}", message);
    assert_eq!(failed.chunk_count, 3);
    assert_eq!(failed.context, Some(context()));
    assert!(failed.asset.is_none());

    assert!(manager.save().unwrap());
    let done = wait_for_status(&manager, SessionStatus::Success).await;
    assert!(done.asset.is_some());
    assert!(done.save_error.is_none());
    assert_eq!(uploader.calls(), 2);
    assert_eq!(uploader.uploaded()[0].size_bytes(), 12);
}

#[tokio::test(start_paused = true)]
async fn error_state_stays_until_user_acts() {
    let device = MockDevice::new();
    let uploader = MockUploader::new();
    uploader.fail_next(UploadError::RequestFailed("connection refused".to_string()));
    let manager = manager(&device, &uploader);

    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.5)).await;
    manager.save().unwrap();
    wait_for_status(&manager, SessionStatus::Error).await;

    sleep(secs(60.0)).await;
    assert_eq!(manager.snapshot().status, SessionStatus::Error);

    assert!(manager.discard());
    assert!(manager.is_idle());
}

#[tokio::test(start_paused = true)]
async fn scenario_e_max_duration_auto_pauses() {
    let device = MockDevice::new();
    let uploader = MockUploader::new();
    let config = SessionConfig {
        max_duration: Duration::from_secs(5),
        ..SessionConfig::default()
    };
    let manager = manager_with(&device, &uploader, config);

    manager.start(Some(context())).await.unwrap();
    sleep(secs(4.5)).await;
    let before = manager.snapshot();
    assert_eq!(before.status, SessionStatus::Recording);
    assert_eq!(before.duration_secs, 4);
    assert_eq!(before.remaining_secs(), 1);

    sleep(secs(1.0)).await;
    let after = manager.snapshot();
    assert_eq!(after.status, SessionStatus::Paused);
    assert_eq!(after.duration_secs, 5);
    assert_eq!(after.chunk_count, 5);
    assert!(after.at_limit());
    assert!(after.notice.unwrap_or_default().contains("Maximum recording length"));
    assert_eq!(device.open_handles(), 0);

    // no further recording past the cap
    assert!(!manager.resume().await.unwrap());
    assert_eq!(manager.snapshot().status, SessionStatus::Paused);

    assert!(manager.save().unwrap());
    let done = wait_for_status(&manager, SessionStatus::Success).await;
    assert_eq!(done.duration_secs, 5);
}

#[tokio::test(start_paused = true)]
async fn cap_without_audio_returns_to_idle() {
    let device = MockDevice::new();
    device.go_silent();
    let config = SessionConfig {
        max_duration: Duration::from_secs(2),
        ..SessionConfig::default()
    };
    let manager = manager_with(&device, &MockUploader::new(), config);

    manager.start(Some(context())).await.unwrap();
    sleep(secs(2.5)).await;

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Idle);
    assert!(snapshot
        .notice
        .unwrap_or_default()
        .contains("no audio captured"));
    assert_eq!(device.open_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_are_noops_out_of_state() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    assert!(!manager.pause().unwrap());
    assert!(!manager.resume().await.unwrap());
    assert!(manager.is_idle());

    manager.start(Some(context())).await.unwrap();
    assert!(!manager.resume().await.unwrap());
    assert_eq!(manager.snapshot().status, SessionStatus::Recording);

    sleep(secs(2.5)).await;
    assert!(manager.pause().unwrap());
    let paused = manager.snapshot();
    assert!(!manager.pause().unwrap());
    let again = manager.snapshot();
    assert_eq!(again.status, SessionStatus::Paused);
    assert_eq!(again.duration_secs, paused.duration_secs);
    assert_eq!(again.chunk_count, paused.chunk_count);
}

#[tokio::test(start_paused = true)]
async fn pause_before_any_audio_keeps_recording() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    assert!(!manager.pause().unwrap());
    assert_eq!(manager.snapshot().status, SessionStatus::Recording);

    sleep(secs(1.5)).await;
    assert_eq!(manager.snapshot().duration_secs, 1);
}

#[tokio::test(start_paused = true)]
async fn pause_flushes_partial_tail() {
    let device = MockDevice::new();
    device.set_tail(&[9, 9]);
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.5)).await;
    assert!(manager.pause().unwrap());

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.chunk_count, 2);
    assert_eq!(snapshot.captured_bytes, 6);
}

#[tokio::test(start_paused = true)]
async fn discard_ignores_late_upload() {
    let device = MockDevice::new();
    let uploader = MockUploader::with_delay(secs(5.0));
    let manager = manager(&device, &uploader);

    manager.start(Some(context())).await.unwrap();
    sleep(secs(2.5)).await;
    assert!(manager.save().unwrap());
    assert!(manager.discard());

    let discarded = manager.snapshot();
    assert_eq!(discarded.status, SessionStatus::Idle);
    assert!(discarded.context.is_none());
    assert_eq!(discarded.duration_secs, 0);
    assert_eq!(discarded.chunk_count, 0);

    sleep(secs(6.0)).await;
    let later = manager.snapshot();
    assert_eq!(later.status, SessionStatus::Idle);
    assert!(later.asset.is_none());
    assert_eq!(uploader.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn discard_from_every_active_state() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.5)).await;
    assert!(manager.discard());
    assert!(manager.is_idle());

    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.5)).await;
    manager.pause().unwrap();
    assert!(manager.discard());
    assert!(manager.is_idle());

    assert!(!manager.discard());
    assert_eq!(device.open_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn discard_cancels_pending_acquire() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());
    device.hold_acquire();

    let start = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.start(Some(context())).await })
    };
    let mut rx = manager.subscribe();
    rx.wait_for(|s| s.acquiring).await.unwrap();

    assert!(manager.discard());
    assert!(!manager.snapshot().acquiring);

    device.open_gate();
    assert_eq!(start.await.unwrap().unwrap_err(), SessionError::Cancelled);
    assert!(manager.is_idle());
    assert_eq!(device.releases.load(Ordering::SeqCst), 1);
    assert_eq!(device.open_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn permission_denied_leaves_session_idle() {
    let device = MockDevice::new();
    device.fail_next_acquire(CaptureError::PermissionDenied);
    let manager = manager(&device, &MockUploader::new());

    let err = manager.start(Some(context())).await.unwrap_err();
    assert_eq!(err, SessionError::PermissionDenied);
    let snapshot = manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Idle);
    assert!(snapshot.notice.unwrap_or_default().contains("settings"));

    manager.start(Some(context())).await.unwrap();
    assert_eq!(manager.snapshot().status, SessionStatus::Recording);
}

#[tokio::test(start_paused = true)]
async fn missing_device_is_unavailable() {
    let device = MockDevice::new();
    device.fail_next_acquire(CaptureError::NoAudioDevice);
    let manager = manager(&device, &MockUploader::new());

    let err = manager.start(Some(context())).await.unwrap_err();
    assert!(matches!(err, SessionError::DeviceUnavailable(_)));
    assert!(manager.is_idle());
}

#[tokio::test(start_paused = true)]
async fn device_loss_with_audio_pauses_session() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    sleep(secs(2.5)).await;
    device.lose_device();
    sleep(secs(1.0)).await;

    let interrupted = manager.snapshot();
    assert_eq!(interrupted.status, SessionStatus::Paused);
    assert_eq!(interrupted.chunk_count, 2);
    assert_eq!(interrupted.duration_secs, 2);
    assert!(interrupted
        .notice
        .unwrap_or_default()
        .contains("stopped responding"));
    assert_eq!(device.open_handles(), 0);

    // resume re-acquires in the format already recorded
    assert!(manager.resume().await.unwrap());
    assert_eq!(device.last_preferences(), vec![AudioFormat::WebmOpus]);
    assert_eq!(manager.snapshot().status, SessionStatus::Recording);

    sleep(secs(1.2)).await;
    assert_eq!(manager.snapshot().duration_secs, 3);
}

#[tokio::test(start_paused = true)]
async fn device_loss_without_audio_returns_to_idle() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    device.lose_device();
    sleep(secs(1.5)).await;

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Idle);
    assert!(snapshot.context.is_none());
    assert!(snapshot.notice.is_some());
}

#[tokio::test(start_paused = true)]
async fn resume_reacquires_device_lost_while_paused() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.5)).await;
    assert!(manager.pause().unwrap());

    device.fail_resume();
    assert!(manager.resume().await.unwrap());
    assert_eq!(device.acquires.load(Ordering::SeqCst), 2);
    assert_eq!(device.last_preferences(), vec![AudioFormat::WebmOpus]);
    assert_eq!(device.open_handles(), 1);

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Recording);
    assert_eq!(snapshot.chunk_count, 1);
}

#[tokio::test(start_paused = true)]
async fn failed_reacquire_on_resume_stays_paused() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.5)).await;
    assert!(manager.pause().unwrap());

    device.fail_resume();
    device.fail_next_acquire(CaptureError::PermissionDenied);
    assert_eq!(
        manager.resume().await.unwrap_err(),
        SessionError::PermissionDenied
    );
    let snapshot = manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Paused);
    assert_eq!(snapshot.chunk_count, 1);
    assert!(!snapshot.acquiring);
    assert_eq!(device.open_handles(), 0);

    assert!(manager.resume().await.unwrap());
    assert_eq!(manager.snapshot().status, SessionStatus::Recording);
    assert_eq!(device.acquires.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn oversized_recording_is_rejected_before_upload() {
    let device = MockDevice::new();
    let uploader = MockUploader::new();
    let config = SessionConfig {
        max_upload_bytes: 10,
        ..SessionConfig::default()
    };
    let manager = manager_with(&device, &uploader, config);

    manager.start(Some(context())).await.unwrap();
    sleep(secs(3.5)).await;
    manager.save().unwrap();

    let failed = wait_for_status(&manager, SessionStatus::Error).await;
    assert!(failed.save_error.unwrap_or_default().contains("upload limit"));
    assert_eq!(uploader.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn wav_fallback_is_packaged_with_header() {
    let device = MockDevice::new();
    device.support_only(&[AudioFormat::Wav]);
    let uploader = MockUploader::new();
    let manager = manager(&device, &uploader);

    manager.start(Some(context())).await.unwrap();
    assert_eq!(manager.snapshot().format, Some(AudioFormat::Wav));
    sleep(secs(2.5)).await;
    manager.save().unwrap();
    wait_for_status(&manager, SessionStatus::Success).await;

    let uploaded = uploader.uploaded();
    assert!(uploaded[0].name.ends_with(".wav"));
    assert_eq!(&uploaded[0].data[..4], b"RIFF");
}

#[tokio::test(start_paused = true)]
async fn success_returns_to_idle_after_display_window() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.5)).await;
    manager.save().unwrap();
    wait_for_status(&manager, SessionStatus::Success).await;

    sleep(secs(3.5)).await;
    assert!(manager.is_idle());
    assert!(manager.attachable().is_none());
}

#[tokio::test(start_paused = true)]
async fn next_action_leaves_success() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.5)).await;
    manager.save().unwrap();
    wait_for_status(&manager, SessionStatus::Success).await;

    manager.start(Some(other_context())).await.unwrap();
    let snapshot = manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Recording);
    assert_eq!(snapshot.context, Some(other_context()));
    assert_eq!(snapshot.duration_secs, 0);

    // the old display timer must not end the new session
    sleep(secs(4.0)).await;
    assert_eq!(manager.snapshot().status, SessionStatus::Recording);
}

#[tokio::test(start_paused = true)]
async fn acknowledge_clears_success() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    assert!(!manager.acknowledge());
    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.5)).await;
    manager.save().unwrap();
    wait_for_status(&manager, SessionStatus::Success).await;

    assert!(manager.acknowledge());
    assert!(manager.is_idle());
}

#[tokio::test(start_paused = true)]
async fn rejected_start_keeps_unattached_success() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.5)).await;
    manager.save().unwrap();
    let saved = wait_for_status(&manager, SessionStatus::Success).await;

    assert_eq!(
        manager.start(None).await.unwrap_err(),
        SessionError::InvalidContext
    );
    let snapshot = manager.snapshot();
    assert_eq!(snapshot.status, SessionStatus::Success);
    assert_eq!(snapshot.asset, saved.asset);
    let (bound, _) = manager.attachable().expect("asset still attachable");
    assert_eq!(bound, context());
    assert_eq!(device.acquires.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn header_needs_page_context_and_confirmation() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());
    let controller: Arc<dyn SessionController> = Arc::new(manager.clone());
    let mut header = HeaderControlBar::new(Arc::clone(&controller));

    assert!(!header.can_start_recording());
    assert!(header.view().actions.is_empty());
    assert_eq!(
        header.invoke(HeaderAction::Start, false).await.unwrap_err(),
        SessionError::InvalidContext
    );

    header.set_page_context(Some(context()));
    assert_eq!(header.view().actions, vec![HeaderAction::Start]);
    assert!(header.invoke(HeaderAction::Start, false).await.unwrap());
    sleep(secs(1.5)).await;

    assert!(!header.invoke(HeaderAction::Discard, false).await.unwrap());
    assert_eq!(controller.snapshot().status, SessionStatus::Recording);
    assert!(header.invoke(HeaderAction::Discard, true).await.unwrap());
    assert!(controller.is_idle());
}

#[tokio::test(start_paused = true)]
async fn header_stays_in_control_on_other_pages() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());
    let controller: Arc<dyn SessionController> = Arc::new(manager.clone());
    let mut header = HeaderControlBar::new(Arc::clone(&controller));

    header.set_page_context(Some(context()));
    header.invoke(HeaderAction::Start, false).await.unwrap();
    sleep(secs(1.5)).await;

    // user moved to a page without a report
    header.set_page_context(None);
    let view = header.view();
    assert!(view.actions.contains(&HeaderAction::Pause));
    assert!(header.invoke(HeaderAction::Pause, false).await.unwrap());
    assert!(header.view().actions.contains(&HeaderAction::Resume));
}

#[tokio::test(start_paused = true)]
async fn panels_mirror_the_shared_session() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());
    let controller: Arc<dyn SessionController> = Arc::new(manager.clone());
    let formats = manager.config().formats.clone();

    let own = InlinePanel::new(
        context(),
        Arc::clone(&controller),
        device.clone(),
        formats.clone(),
    );
    let other = InlinePanel::new(
        other_context(),
        Arc::clone(&controller),
        device.clone(),
        formats,
    );
    assert_eq!(own.status(), PanelStatus::NoRecording);

    manager.start(Some(context())).await.unwrap();
    sleep(secs(2.5)).await;
    assert_eq!(
        own.status(),
        PanelStatus::ThisReport {
            status: SessionStatus::Recording,
            duration_secs: 2
        }
    );
    assert!(matches!(other.status(), PanelStatus::OtherReport { .. }));

    manager.save().unwrap();
    wait_for_status(&manager, SessionStatus::Success).await;
    assert!(own.attachable_asset().is_some());
    assert!(other.attachable_asset().is_none());
}

#[tokio::test(start_paused = true)]
async fn local_clip_is_independent_of_session() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());
    let controller: Arc<dyn SessionController> = Arc::new(manager.clone());
    let panel = InlinePanel::new(
        context(),
        Arc::clone(&controller),
        device.clone(),
        vec![AudioFormat::OggOpus],
    );

    let clip = panel.clip();
    clip.start().await.unwrap();
    assert!(clip.is_recording());
    assert!(manager.is_idle());

    let finished = clip.stop().unwrap().expect("clip data");
    assert_eq!(finished.format, AudioFormat::OggOpus);
    assert_eq!(finished.data, vec![1, 2, 3, 4]);
    assert_eq!(
        finished.into_asset(&context()).name,
        "TBM_t1_2025-01-10_audio_note.ogg"
    );
    assert!(clip.stop().unwrap().is_none());
    assert_eq!(device.open_handles(), 0);
    assert!(manager.is_idle());
}

#[tokio::test(start_paused = true)]
async fn local_clip_is_saved_for_its_report() {
    let device = MockDevice::new();
    let uploader = MockUploader::new();
    let manager = manager(&device, &uploader);
    let controller: Arc<dyn SessionController> = Arc::new(manager.clone());
    let panel = InlinePanel::new(
        context(),
        Arc::clone(&controller),
        device.clone(),
        vec![AudioFormat::OggOpus],
    );

    assert!(panel.save_clip(uploader.as_ref()).await.unwrap().is_none());

    panel.clip().start().await.unwrap();
    let saved = panel
        .save_clip(uploader.as_ref())
        .await
        .unwrap()
        .expect("clip was recording");
    assert_eq!(saved.name, "TBM_t1_2025-01-10_audio_note.ogg");
    assert_eq!(saved.url, "https://files.test/TBM_t1_2025-01-10_audio_note.ogg");
    assert_eq!(saved.size, 4);
    assert_eq!(uploader.calls(), 1);
    assert_eq!(device.open_handles(), 0);
    assert!(manager.is_idle());
}

#[tokio::test(start_paused = true)]
async fn local_clip_refused_while_session_active() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());
    let controller: Arc<dyn SessionController> = Arc::new(manager.clone());
    let panel = InlinePanel::new(
        context(),
        Arc::clone(&controller),
        device.clone(),
        manager.config().formats.clone(),
    );

    manager.start(Some(context())).await.unwrap();
    assert_eq!(
        panel.clip().start().await.unwrap_err(),
        SessionError::SessionBusy
    );
    assert!(!panel.clip().is_recording());
    assert_eq!(device.acquires.load(Ordering::SeqCst), 1);

    assert!(!panel.clip().cancel());
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_device() {
    let device = MockDevice::new();
    let manager = manager(&device, &MockUploader::new());

    manager.start(Some(context())).await.unwrap();
    sleep(secs(1.5)).await;
    manager.shutdown();

    assert!(manager.is_idle());
    assert_eq!(device.open_handles(), 0);
    assert_eq!(
        manager.start(Some(context())).await.unwrap_err(),
        SessionError::Cancelled
    );
}
