//! Configuration loading and types

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{WrapErr, bail};
use serde::{Deserialize, Serialize};
use smartupd_core::{AggregatorSettings, AutoUpdateConfig, SensorPublish};
use smartupd_hass::HassConnection;

/// Environment variable pointing at the config file
pub const CONFIG_ENV: &str = "SMARTUPD_CONFIG";
/// Environment variable holding the Home Assistant access token
pub const TOKEN_ENV: &str = "SMARTUPD_HASS_TOKEN";

/// Top-level configuration for the smartupd daemon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Daemon server settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Home Assistant connection
    #[serde(default)]
    pub hass: HassConfig,
    /// Update sensor settings
    #[serde(default)]
    pub sensor: SensorConfig,
    /// Initial options, used until options are saved through the API
    #[serde(default)]
    pub options: AutoUpdateConfig,
    /// File the configuration was read from, `None` for built-in defaults
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Daemon server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address and port to bind to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log output format
    #[serde(default)]
    pub log_format: LogFormat,
    /// Directory for the history and options files
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// Companion card script served under `/hacsfiles`
    #[serde(default)]
    pub card_path: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            storage_dir: default_storage_dir(),
            card_path: None,
        }
    }
}

/// Home Assistant connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HassConfig {
    /// Base URL of the instance
    #[serde(default = "default_hass_url")]
    pub url: String,
    /// Long-lived access token, falls back to `SMARTUPD_HASS_TOKEN`
    #[serde(default)]
    pub token: Option<String>,
    /// Timeout for state reads and writes
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Timeout for install and restart calls
    #[serde(default = "default_service_timeout")]
    pub service_timeout_secs: u64,
}

impl Default for HassConfig {
    fn default() -> Self {
        Self {
            url: default_hass_url(),
            token: None,
            request_timeout_secs: default_request_timeout(),
            service_timeout_secs: default_service_timeout(),
        }
    }
}

/// Update sensor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Seconds between aggregation cycles
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    /// Registry platform whose update entities are tracked
    #[serde(default = "default_source_platform")]
    pub source_platform: String,
    /// Core update entity appended last; empty string disables it
    #[serde(default = "default_core_update_entity")]
    pub core_update_entity: String,
    /// Publish the snapshot back to Home Assistant
    #[serde(default = "default_true")]
    pub publish: bool,
    /// Entity id of the published sensor
    #[serde(default = "default_publish_entity")]
    pub publish_entity: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval(),
            source_platform: default_source_platform(),
            core_update_entity: default_core_update_entity(),
            publish: true,
            publish_entity: default_publish_entity(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8124".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("smartupd"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn default_hass_url() -> String {
    "http://homeassistant.local:8123".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_service_timeout() -> u64 {
    1800
}

fn default_scan_interval() -> u64 {
    30
}

fn default_source_platform() -> String {
    "hacs".to_string()
}

fn default_core_update_entity() -> String {
    "update.home_assistant_core_update".to_string()
}

fn default_publish_entity() -> String {
    "sensor.smart_updater_updates".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .wrap_err_with(|| format!("failed to parse {}", path.display()))?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Load from an explicit path, or from the default locations
    ///
    /// # Errors
    /// Returns error if a config file exists but is invalid
    pub fn resolve(explicit: Option<&Path>) -> eyre::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        }
    }

    /// Load from default paths or use defaults
    ///
    /// Runs before logging is set up; callers report `source` afterwards.
    ///
    /// # Errors
    /// Returns error if a config file exists but is invalid
    pub fn load_default() -> eyre::Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }

        let paths = [
            Some(PathBuf::from("smartupd.toml")),
            Some(PathBuf::from("/etc/smartupd/smartupd.toml")),
            dirs::config_dir().map(|p| p.join("smartupd/smartupd.toml")),
        ];

        for path in paths.into_iter().flatten() {
            if path.exists() {
                return Self::load(&path);
            }
        }

        Ok(Config::default())
    }

    /// Connection settings for the host client
    ///
    /// # Errors
    /// Returns error if no access token is configured
    pub fn hass_connection(&self) -> eyre::Result<HassConnection> {
        let token = match &self.hass.token {
            Some(token) if !token.trim().is_empty() => token.trim().to_string(),
            _ => match std::env::var(TOKEN_ENV) {
                Ok(token) if !token.trim().is_empty() => token.trim().to_string(),
                _ => bail!("no Home Assistant token: set hass.token or {TOKEN_ENV}"),
            },
        };

        Ok(HassConnection {
            url: self.hass.url.clone(),
            token,
            request_timeout: Duration::from_secs(self.hass.request_timeout_secs),
            service_timeout: Duration::from_secs(self.hass.service_timeout_secs),
        })
    }

    #[must_use]
    pub fn aggregator_settings(&self) -> AggregatorSettings {
        let core = self.sensor.core_update_entity.trim();
        AggregatorSettings {
            source_platform: self.sensor.source_platform.clone(),
            core_update_entity: (!core.is_empty()).then(|| core.to_string()),
        }
    }

    #[must_use]
    pub fn sensor_publish(&self) -> Option<SensorPublish> {
        self.sensor.publish.then(|| SensorPublish {
            entity_id: self.sensor.publish_entity.clone(),
            ..SensorPublish::default()
        })
    }

    #[must_use]
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.sensor.scan_interval_secs.max(1))
    }
}
