use serde::Deserialize;

pub mod setup;

/// The built-in configuration, loaded before any file.
pub const DEFAULT_CONFIG: &str = include_str!("../../assets/default_config.toml");

#[derive(Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub decrypt: DecryptConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Identity stamped on exceptions created by the tool.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DecryptConfig {
    /// Whether this tool is trusted to decrypt encrypted debug values.
    #[serde(default)]
    pub allowed: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Route panics through the logger.
    #[serde(default = "default_true")]
    pub panic: bool,
    #[serde(flatten)]
    pub log4rs: log4rs::config::RawConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            panic: true,
            log4rs: log4rs::config::RawConfig::default(),
        }
    }
}
