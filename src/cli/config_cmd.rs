//! Config command handler

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;
use crate::domain::recording::{AudioFormat, Duration};

use super::args::{is_valid_config_key, ConfigAction, VALID_CONFIG_KEYS};
use super::presenter::Presenter;

const NOT_SET: &str = "(not set)";

/// Handle config subcommand
pub async fn handle_config_command<S: ConfigStore>(
    action: ConfigAction,
    store: &S,
    presenter: &Presenter,
) -> Result<(), ConfigError> {
    match action {
        ConfigAction::Init => handle_init(store, presenter).await,
        ConfigAction::Set { key, value } => handle_set(store, presenter, &key, &value).await,
        ConfigAction::Get { key } => handle_get(store, presenter, &key).await,
        ConfigAction::List => handle_list(store, presenter).await,
        ConfigAction::Path => {
            presenter.output(&store.path().to_string_lossy());
            Ok(())
        }
    }
}

async fn handle_init<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    store.init().await?;
    presenter.success(&format!(
        "Config file created at: {}",
        store.path().display()
    ));
    Ok(())
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    if is_valid_config_key(key) {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            key: key.to_string(),
            message: format!("Unknown key. Valid keys: {}", VALID_CONFIG_KEYS.join(", ")),
        })
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        key: key.to_string(),
        message: message.into(),
    }
}

/// Apply `key = value` to `config`, validating the value
pub fn apply_value(config: &mut AppConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    check_key(key)?;

    match key {
        "upload_url" => {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(invalid(key, "URL must start with http:// or https://"));
            }
            config.upload_url = Some(value.to_string());
        }
        "api_token" => config.api_token = Some(value.to_string()),
        "max_duration" | "success_display" => {
            let parsed = value
                .parse::<Duration>()
                .map_err(|e| invalid(key, e.to_string()))?;
            if parsed.as_secs() == 0 {
                return Err(invalid(key, "Duration must be at least 1 second"));
            }
            if key == "max_duration" {
                config.max_duration = Some(value.to_string());
            } else {
                config.success_display = Some(value.to_string());
            }
        }
        "max_upload_mb" => {
            let mb: u64 = value
                .parse()
                .map_err(|_| invalid(key, "Value must be a whole number of megabytes"))?;
            if mb == 0 {
                return Err(invalid(key, "Value must be greater than 0"));
            }
            config.max_upload_mb = Some(mb);
        }
        "formats" => {
            let mut formats = Vec::new();
            for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let format = item.parse::<AudioFormat>().map_err(|e| invalid(key, e))?;
                formats.push(format.as_str().to_string());
            }
            if formats.is_empty() {
                return Err(invalid(key, "List at least one format"));
            }
            config.formats = Some(formats);
        }
        _ => return Err(invalid(key, "Unknown key")),
    }
    Ok(())
}

/// Read `key` from `config` as display text
pub fn read_value(config: &AppConfig, key: &str) -> Result<Option<String>, ConfigError> {
    check_key(key)?;

    Ok(match key {
        "upload_url" => config.upload_url.clone(),
        "api_token" => config.api_token.as_deref().map(mask_token),
        "max_duration" => config.max_duration.clone(),
        "max_upload_mb" => config.max_upload_mb.map(|mb| mb.to_string()),
        "success_display" => config.success_display.clone(),
        "formats" => config.formats.as_ref().map(|f| f.join(",")),
        _ => None,
    })
}

async fn handle_set<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let mut config = store.load().await?;
    apply_value(&mut config, key, value)?;
    store.save(&config).await?;

    let shown = read_value(&config, key)?.unwrap_or_default();
    presenter.success(&format!("{} = {}", key, shown));
    Ok(())
}

async fn handle_get<S: ConfigStore>(
    store: &S,
    presenter: &Presenter,
    key: &str,
) -> Result<(), ConfigError> {
    check_key(key)?;
    let config = store.load().await?;
    let value = read_value(&config, key)?;
    presenter.output(value.as_deref().unwrap_or(NOT_SET));
    Ok(())
}

async fn handle_list<S: ConfigStore>(store: &S, presenter: &Presenter) -> Result<(), ConfigError> {
    let config = store.load().await?;
    for key in VALID_CONFIG_KEYS {
        let value = read_value(&config, key)?;
        presenter.key_value(key, value.as_deref().unwrap_or(NOT_SET));
    }
    Ok(())
}

/// Mask a token for display
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
