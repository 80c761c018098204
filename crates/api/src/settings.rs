//! Layered configuration
//!
//! Defaults, then an optional config file, then `DROWSY_*` environment
//! variables (`__` separates nested keys, e.g. `DROWSY_SERVER__BIND_ADDR`).

use std::path::Path;

use alerting::AlarmConfig;
use camera_capture::CameraConfig;
use config::{Config, ConfigError, Environment, File};
use dms::DmsConfig;
use serde::Deserialize;

/// Config file used when `DROWSY_CONFIG` is unset (extension optional)
pub const DEFAULT_CONFIG_PATH: &str = "drowsiness";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub camera: CameraConfig,
    pub dms: DmsConfig,
    pub alarm: AlarmConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
    /// Install the Prometheus recorder and serve `/metrics`
    pub metrics: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            metrics: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// trace, debug, info, warn or error
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load from `DROWSY_CONFIG` (or the default path) and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("DROWSY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(Path::new(&path))
    }

    /// Load from a config file (may be absent) and the environment
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_sources(path, environment())
    }

    fn from_sources(path: &Path, env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()
    }
}

/// `DROWSY_` prefix, `__` between nested keys
fn environment() -> Environment {
    Environment::with_prefix("DROWSY")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
