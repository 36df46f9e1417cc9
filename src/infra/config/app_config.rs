use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use tabula_app::session::SessionSettings;

pub const CURRENT_VERSION: u32 = 1;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find config directory")]
    NoConfigDir,
    #[error("Failed to read config: {0}")]
    ReadError(String),
    #[error("Invalid config format: {0}")]
    InvalidFormat(String),
    #[error("Config version mismatch: found v{found}, expected v{expected}")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub version: u32,
    pub content: ContentSection,
    pub gateway: GatewaySection,
    pub tables: TablesSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSection {
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub timeout_secs: u64,
    pub psql_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablesSection {
    pub max_create_attempts: u32,
    pub default_base_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            content: ContentSection::default(),
            gateway: GatewaySection::default(),
            tables: TablesSection::default(),
        }
    }
}

impl Default for ContentSection {
    fn default() -> Self {
        Self { page_size: 100 }
    }
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            psql_path: "psql".to_string(),
        }
    }
}

impl Default for TablesSection {
    fn default() -> Self {
        Self {
            max_create_attempts: 100,
            default_base_name: "new_table".to_string(),
        }
    }
}

impl AppConfig {
    /// `<config dir>/tabula/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let config_base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_base.join("tabula").join(CONFIG_FILE_NAME))
    }

    /// Missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        if config.version != CURRENT_VERSION {
            return Err(ConfigError::VersionMismatch {
                found: config.version,
                expected: CURRENT_VERSION,
            });
        }
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.content.page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "content.page_size must be at least 1".into(),
            ));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "gateway.timeout_secs must be at least 1".into(),
            ));
        }
        if self.tables.max_create_attempts == 0 {
            return Err(ConfigError::InvalidValue(
                "tables.max_create_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            page_size: self.content.page_size,
            gateway_timeout: Duration::from_secs(self.gateway.timeout_secs),
            max_create_attempts: self.tables.max_create_attempts,
        }
    }
}
