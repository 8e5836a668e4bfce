use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::codec::Generation;
use crate::platform;
use crate::protocol::PROTOCOL_VERSION;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the mixplay HTTP control surface.
    #[serde(default = "platform::default_server_url")]
    pub base_url: String,
    /// Request shape: `"json"` (envelope) or `"path"` (code in the path).
    #[serde(default)]
    pub generation: Generation,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Delay between two status requests.  The cadence is independent of
    /// round-trip time, so requests may overlap.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    #[serde(default = "default_expected_version")]
    pub expected_version: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// Local preference file (UI size, shortcuts).
    #[serde(default = "default_preferences_file")]
    pub file: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: platform::default_server_url(),
            generation: Generation::default(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            expected_version: default_expected_version(),
        }
    }
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            file: default_preferences_file(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_interval_ms() -> u64 {
    500
}

fn default_expected_version() -> i32 {
    PROTOCOL_VERSION
}

fn default_preferences_file() -> PathBuf {
    platform::data_dir().join("preferences.toml")
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        // A zero interval would spin the ticker.
        Duration::from_millis(self.interval_ms.max(50))
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://127.0.0.1:2347");
        assert_eq!(config.server.generation, Generation::Json);
        assert_eq!(config.polling.interval_ms, 500);
        assert_eq!(config.protocol.expected_version, PROTOCOL_VERSION);
        assert!(config.preferences.file.ends_with("mixctl/preferences.toml"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            generation = "path"

            [polling]
            interval_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.server.generation, Generation::Path);
        assert_eq!(config.server.request_timeout_ms, 5000);
        assert_eq!(config.polling.interval(), Duration::from_millis(50));
        assert_eq!(config.protocol.expected_version, PROTOCOL_VERSION);
    }
}
