//! Configuration value objects

mod app_config;

pub use app_config::{AppConfig, DEFAULT_MAX_UPLOAD_MB, DEFAULT_UPLOAD_URL};
