pub mod app_config;

pub use app_config::{AppConfig, ConfigError, CURRENT_VERSION};
