//! XDG config store adapter

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::application::ports::ConfigStore;
use crate::domain::config::AppConfig;
use crate::domain::error::ConfigError;

/// Application directory under the XDG config home
const APP_DIR: &str = "tbm-recorder";

/// Written above the TOML body on every save
const FILE_HEADER: &str = "# tbm-recorder configuration\n# Edit by hand or with `tbm-recorder config set <key> <value>`.\n\n";

/// Config store at `$XDG_CONFIG_HOME/tbm-recorder/config.toml`
pub struct XdgConfigStore {
    path: PathBuf,
}

impl XdgConfigStore {
    pub fn new() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("~/.config"));
        Self {
            path: base.join(APP_DIR).join("config.toml"),
        }
    }

    /// Store at an explicit path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse_toml(content: &str) -> Result<AppConfig, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn render(config: &AppConfig) -> Result<String, ConfigError> {
        let body =
            toml::to_string_pretty(config).map_err(|e| ConfigError::WriteError(e.to_string()))?;
        Ok(format!("{}{}", FILE_HEADER, body))
    }

    /// The file may hold an API token; keep it private to the owner
    #[cfg(unix)]
    async fn restrict_permissions(&self) -> Result<(), ConfigError> {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))
    }

    #[cfg(not(unix))]
    async fn restrict_permissions(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}

impl Default for XdgConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ConfigStore for XdgConfigStore {
    async fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.exists() {
            debug!(path = %self.path.display(), "no config file, using empty config");
            return Ok(AppConfig::empty());
        }

        let content = fs::read_to_string(&self.path)
            .await
            .map_err(|e| ConfigError::ReadError(e.to_string()))?;
        Self::parse_toml(&content)
    }

    async fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        fs::write(&self.path, Self::render(config)?)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        self.restrict_permissions().await
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    async fn init(&self) -> Result<(), ConfigError> {
        if self.exists() {
            return Err(ConfigError::AlreadyExists(
                self.path.to_string_lossy().to_string(),
            ));
        }
        self.save(&AppConfig::defaults()).await
    }
}
