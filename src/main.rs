//! TBM Recorder CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tbm_recorder::cli::{
    app::{load_merged_config, run_download, run_record, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use tbm_recorder::domain::config::AppConfig;
use tbm_recorder::domain::recording::Duration;
use tbm_recorder::infrastructure::XdgConfigStore;

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "tbm_recorder=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let presenter = Presenter::new();

    match cli.command {
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Commands::Download { url, output } => {
            let config = load_merged_config(AppConfig::empty()).await;
            run_download(&url, &output, &config).await
        }
        Commands::Record(options) => {
            if let Some(raw) = options.max_duration.as_deref() {
                match raw.parse::<Duration>() {
                    Ok(d) if d.as_secs() > 0 => {}
                    Ok(_) => {
                        presenter.error("Invalid max-duration: must be at least 1 second");
                        return ExitCode::from(EXIT_USAGE_ERROR);
                    }
                    Err(e) => {
                        presenter.error(&format!("Invalid max-duration: {}", e));
                        return ExitCode::from(EXIT_USAGE_ERROR);
                    }
                }
            }

            // Upload URL and max duration can be overridden per run
            let cli_config = AppConfig {
                upload_url: options.upload_url.clone(),
                max_duration: options.max_duration.clone(),
                ..Default::default()
            };
            let config = load_merged_config(cli_config).await;

            run_record(options, config).await
        }
    }
}
