//! Configuration management for mailgate

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Gateway (embedded HTTP listener) settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Bridge process settings
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for log files (the bridge must never log to stdout)
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(crate::APP_NAME)
        .join("logs")
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
        }
    }
}

/// Gateway listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Loopback port the gateway listens on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the bearer token file, rewritten on each gateway start
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

fn default_port() -> u16 {
    8765
}

fn default_token_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".mailgate-token")
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            token_file: default_token_file(),
        }
    }
}

/// Bridge process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Per-request timeout in seconds for forwarded calls.
    /// The timeout abandons the client-side wait only; server-side work
    /// already started is not cancelled.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Path to the config file: ~/.config/mailgate/config.toml
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(crate::APP_NAME)
            .join("config.toml")
    }

    /// Load configuration from the default path, falling back to defaults
    /// when no file exists.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&contents)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gateway.port, 8765);
        assert_eq!(config.bridge.request_timeout_secs, 30);
        assert!(config
            .gateway
            .token_file
            .to_string_lossy()
            .ends_with(".mailgate-token"));
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(
            r#"
            [gateway]
            port = 9000

            [bridge]
            request_timeout_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.bridge.request_timeout_secs, 5);
        assert_eq!(config.general.log_level, "info");
    }
}
