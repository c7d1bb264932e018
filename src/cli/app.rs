//! App runners for the record and download commands

use std::env;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::application::ports::{AssetUploader, CaptureDevice, ConfigStore};
use crate::application::{
    is_report_route, NavigationGuard, NavigationOutcome, SessionConfig, SessionController,
    SessionManager, SessionSnapshot,
};
use crate::domain::config::AppConfig;
use crate::domain::recording::{human_readable_size, RecordingContext};
use crate::domain::session::SessionStatus;
use crate::infrastructure::{CpalCaptureDevice, HttpAssetUploader, JsonDraftStore, XdgConfigStore};
use crate::ui::{HeaderAction, HeaderControlBar, InlinePanel};

use super::args::RecordOptions;
use super::presenter::Presenter;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load().await.unwrap_or_else(|e| {
        debug!(error = %e, "ignoring unreadable config file");
        AppConfig::empty()
    });

    let env_config = AppConfig {
        upload_url: env::var("TBM_UPLOAD_URL").ok().filter(|s| !s.is_empty()),
        api_token: env::var("TBM_API_TOKEN").ok().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config)
}

fn uploader_for(config: &AppConfig) -> HttpAssetUploader {
    HttpAssetUploader::new(config.upload_url_or_default()).with_token(config.api_token.clone())
}

/// One line typed at the record prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Action(HeaderAction),
    Navigate { route: String, force: bool },
    /// Start or save the report's field clip, or drop it
    Clip { cancel: bool },
    Status,
    Help,
    Quit { force: bool },
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        Some(match word {
            "b" | "start" => Self::Action(HeaderAction::Start),
            "p" | "pause" => Self::Action(HeaderAction::Pause),
            "r" | "resume" => Self::Action(HeaderAction::Resume),
            "s" | "save" => Self::Action(HeaderAction::Save),
            "d" | "discard" => Self::Action(HeaderAction::Discard),
            "o" | "done" => Self::Action(HeaderAction::Acknowledge),
            "n" | "n!" if !rest.is_empty() => Self::Navigate {
                route: rest.to_string(),
                force: word.ends_with('!'),
            },
            "c" | "clip" => Self::Clip { cancel: false },
            "c!" => Self::Clip { cancel: true },
            "i" | "status" => Self::Status,
            "h" | "help" | "?" => Self::Help,
            "q" | "quit" => Self::Quit { force: false },
            "q!" => Self::Quit { force: true },
            _ => Self::Unknown(line.to_string()),
        })
    }
}

const HELP: &str = "b start | p pause | r resume | s save/retry | d discard | o done | \
c field clip start/save (c! drops it) | n <route> navigate (n! forces) | i status | \
q quit (q! discards)";

/// Run an interactive recording session for one TBM report
pub async fn run_record(options: RecordOptions, config: AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();

    let context = match RecordingContext::parse(options.team_id, &options.team_name, &options.date) {
        Ok(context) => context,
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
    };

    let device: Arc<dyn CaptureDevice> = Arc::new(CpalCaptureDevice::new());
    let uploader: Arc<dyn AssetUploader> = Arc::new(uploader_for(&config));
    let session_config = SessionConfig::from_app_config(&config);
    let formats = session_config.formats.clone();
    let manager = SessionManager::new(Arc::clone(&device), Arc::clone(&uploader), session_config);
    let controller: Arc<dyn SessionController> = Arc::new(manager.clone());

    let mut header = HeaderControlBar::new(Arc::clone(&controller));
    header.set_page_context(Some(context.clone()));
    let panel = InlinePanel::new(context.clone(), Arc::clone(&controller), device, formats);
    let guard = NavigationGuard::new(Arc::clone(&controller), Arc::new(JsonDraftStore::new()));
    let mut route = context.report_route();

    presenter.info(&format!("TBM report {} at {}", context, route));
    presenter.info(HELP);

    let mut updates = controller.subscribe();
    let mut last = updates.borrow().clone();
    if let Err(e) = header.invoke(HeaderAction::Start, false).await {
        presenter.error(&e.to_string());
    }

    let mut lines = BufReader::new(stdin()).lines();
    let mut confirm_discard = false;

    let code = loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break EXIT_ERROR;
                }
                let snapshot = updates.borrow_and_update().clone();
                report_change(&mut presenter, &header, &manager, &last, &snapshot);
                last = snapshot;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        manager.shutdown();
                        break if last.status == SessionStatus::Idle { EXIT_SUCCESS } else { EXIT_ERROR };
                    }
                };

                if confirm_discard {
                    confirm_discard = false;
                    if matches!(line.trim(), "y" | "yes") {
                        let _ = header.invoke(HeaderAction::Discard, true).await;
                    } else {
                        presenter.info("Discard cancelled");
                    }
                    continue;
                }

                let Some(command) = Command::parse(&line) else {
                    continue;
                };
                match command {
                    Command::Action(HeaderAction::Discard) => {
                        if controller.is_idle() {
                            presenter.warn("Nothing to discard");
                        } else {
                            presenter.output_inline("Discard the recording? This cannot be undone [y/N] ");
                            confirm_discard = true;
                        }
                    }
                    Command::Action(action) => match header.invoke(action, false).await {
                        Ok(true) => {}
                        Ok(false) => presenter.warn(&format!("{} is not available right now", action.label())),
                        Err(e) => presenter.error(&e.to_string()),
                    },
                    Command::Navigate { route: to, force } => {
                        let outcome = guard.navigate(&route, &to, force).await;
                        match &outcome {
                            NavigationOutcome::DraftSaved => presenter.info("Report draft saved"),
                            NavigationOutcome::Forced(e) => presenter.warn(&e.to_string()),
                            NavigationOutcome::Blocked(e) => {
                                presenter.error(&format!("{} (use n! to leave anyway)", e));
                            }
                            NavigationOutcome::Allowed => {}
                        }
                        if outcome.proceeds() {
                            route = to;
                            let on_report = is_report_route(&route, &context);
                            header.set_page_context(on_report.then(|| context.clone()));
                            presenter.info(&format!("Now at {}", route));
                        }
                    }
                    Command::Clip { .. } if !is_report_route(&route, &context) => {
                        presenter.warn("Field clips are recorded on the report page");
                    }
                    Command::Clip { cancel: true } => {
                        if panel.clip().cancel() {
                            presenter.info("Field clip dropped");
                        }
                    }
                    Command::Clip { cancel: false } if panel.clip().is_recording() => {
                        presenter.start_spinner("Saving field clip");
                        match panel.save_clip(uploader.as_ref()).await {
                            Ok(Some(asset)) => presenter.spinner_success(&format!(
                                "Field clip saved: {} ({})",
                                asset.url,
                                human_readable_size(asset.size)
                            )),
                            Ok(None) => presenter.stop_spinner(),
                            Err(e) => presenter.spinner_fail(&e.to_string()),
                        }
                    }
                    Command::Clip { cancel: false } => match panel.clip().start().await {
                        Ok(()) => presenter.info("Recording field clip; c saves it, c! drops it"),
                        Err(e) => presenter.error(&e.to_string()),
                    },
                    Command::Status => {
                        presenter.show_header(&header.view());
                        if is_report_route(&route, &context) {
                            presenter.info(&panel.status_text());
                        }
                    }
                    Command::Help => presenter.info(HELP),
                    Command::Quit { force } => {
                        let snapshot = controller.snapshot();
                        let settled = matches!(snapshot.status, SessionStatus::Idle | SessionStatus::Success);
                        if settled || force {
                            manager.shutdown();
                            break EXIT_SUCCESS;
                        }
                        presenter.warn("A recording is still open. Save or discard it, or use q! to drop it.");
                    }
                    Command::Unknown(text) => presenter.warn(&format!("Unknown command: {} ({})", text, HELP)),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                presenter.warn("Interrupted, discarding any open recording");
                manager.shutdown();
                break EXIT_ERROR;
            }
        }
    };

    panel.clip().cancel();
    info!(code, "record session finished");
    ExitCode::from(code)
}

/// Print what changed between two snapshots
fn report_change(
    presenter: &mut Presenter,
    header: &HeaderControlBar,
    manager: &SessionManager,
    before: &SessionSnapshot,
    after: &SessionSnapshot,
) {
    if after.status != before.status || after.acquiring != before.acquiring {
        presenter.show_header(&header.view());
    }
    if after.notice.is_some() && after.notice != before.notice {
        if let Some(notice) = &after.notice {
            presenter.warn(notice);
        }
    }
    if after.status == SessionStatus::Success && before.status != SessionStatus::Success {
        if let Some((context, asset)) = manager.attachable() {
            presenter.success(&format!(
                "Attach to report {}: {} ({})",
                context,
                asset.url,
                human_readable_size(asset.size)
            ));
        }
    }
}

/// Download a stored recording to a local file
pub async fn run_download(url: &str, output: &Path, config: &AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();
    presenter.start_spinner(&format!("Downloading {}", url));

    match uploader_for(config).download(url, output).await {
        Ok(bytes) => {
            presenter.spinner_success(&format!(
                "Saved {} ({})",
                output.display(),
                human_readable_size(bytes)
            ));
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.spinner_fail(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}
