//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (`BOTWIRE_*`)
//!
//! Every field has a default, so a config file only needs the keys it
//! changes.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::DEFAULT_COMPRESSION_THRESHOLD;
use crate::error::{BotError, Result};

/// Per-bot configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotConfiguration {
    /// Session, timeout and reconnect settings
    #[serde(default)]
    pub network: NetworkConfig,

    /// Frame codec settings
    #[serde(default)]
    pub codec: CodecConfig,

    /// Media upload/download settings
    #[serde(default)]
    pub media: MediaConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BotConfiguration {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| BotError::Config(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| BotError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("BOTWIRE_SERVER_ADDR") {
            config.network.server_addr = addr;
        }
        if let Some(val) = env_parse("BOTWIRE_REQUEST_TIMEOUT_MS") {
            config.network.request_timeout_ms = val;
        }
        if let Some(val) = env_parse("BOTWIRE_MAX_SEND_RETRIES") {
            config.network.max_send_retries = val;
        }
        if let Some(val) = env_parse("BOTWIRE_HEARTBEAT_INTERVAL_MS") {
            config.network.heartbeat_interval_ms = val;
        }
        if let Some(val) = env_parse("BOTWIRE_RECONNECT_MAX_ATTEMPTS") {
            config.network.reconnect_max_attempts = val;
        }
        if let Some(val) = env_parse("BOTWIRE_LOGIN_TIMEOUT_MS") {
            config.network.login_timeout_ms = val;
        }

        if let Some(val) = env_parse("BOTWIRE_COMPRESSION_THRESHOLD") {
            config.codec.compression_threshold = val;
        }

        if let Ok(url) = std::env::var("BOTWIRE_MEDIA_URL") {
            config.media.base_url = url;
        }

        if let Ok(level) = std::env::var("BOTWIRE_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(val) = env_parse("BOTWIRE_LOG_JSON") {
            config.logging.json = val;
        }

        config
    }

    /// Default config file location (`<config_dir>/botwire/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("botwire").join("config.toml"))
    }

    /// Merge with another config (other takes precedence where it differs from defaults)
    pub fn merge(self, other: Self) -> Self {
        let defaults = Self::default();
        let server_addr = if other.network.server_addr != defaults.network.server_addr {
            other.network.server_addr.clone()
        } else {
            self.network.server_addr.clone()
        };
        let timing = if other.network.timeouts_differ(&defaults.network) {
            other.network
        } else {
            self.network
        };
        Self {
            network: NetworkConfig {
                server_addr,
                ..timing
            },
            codec: if other.codec != defaults.codec {
                other.codec
            } else {
                self.codec
            },
            media: if other.media != defaults.media {
                other.media
            } else {
                self.media
            },
            logging: if other.logging != defaults.logging {
                other.logging
            } else {
                self.logging
            },
        }
    }

    /// Reject settings the session cannot run with
    pub fn validate(&self) -> Result<()> {
        let net = &self.network;
        if net.server_addr.is_empty() {
            return Err(BotError::Config("server_addr must not be empty".to_string()));
        }
        if net.heartbeat_miss_threshold == 0 {
            return Err(BotError::Config(
                "heartbeat_miss_threshold must be at least 1".to_string(),
            ));
        }
        if net.request_timeout_ms == 0 || net.heartbeat_timeout_ms == 0 {
            return Err(BotError::Config("timeouts must be non-zero".to_string()));
        }
        if net.reconnect_backoff_base_ms > net.reconnect_backoff_max_ms {
            return Err(BotError::Config(
                "reconnect_backoff_base_ms exceeds reconnect_backoff_max_ms".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Session timing configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Server address (host:port)
    pub server_addr: String,

    /// TCP connect timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Per-attempt reply timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Retransmissions after the first attempt
    pub max_send_retries: u32,

    /// Linear backoff step between retransmissions in milliseconds
    pub retry_backoff_ms: u64,

    /// Interval between heartbeats while online
    pub heartbeat_interval_ms: u64,

    /// Reply timeout for a single heartbeat
    pub heartbeat_timeout_ms: u64,

    /// Consecutive missed heartbeats before the connection counts as dropped
    pub heartbeat_miss_threshold: u32,

    /// Reconnect attempts before giving up
    pub reconnect_max_attempts: u32,

    /// First reconnect delay in milliseconds
    pub reconnect_backoff_base_ms: u64,

    /// Reconnect delay cap in milliseconds
    pub reconnect_backoff_max_ms: u64,

    /// Deadline for a whole login, captcha rounds included
    pub login_timeout_ms: u64,

    /// Captcha rounds answered before the login fails
    pub max_captcha_rounds: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8080".to_string(),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 5_000,
            max_send_retries: 2,
            retry_backoff_ms: 200,
            heartbeat_interval_ms: 60_000,
            heartbeat_timeout_ms: 5_000,
            heartbeat_miss_threshold: 3,
            reconnect_max_attempts: 5,
            reconnect_backoff_base_ms: 500,
            reconnect_backoff_max_ms: 30_000,
            login_timeout_ms: 60_000,
            max_captcha_rounds: 3,
        }
    }
}

impl NetworkConfig {
    /// Connect timeout
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Per-attempt request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Retry backoff step
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Heartbeat interval
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Heartbeat reply timeout
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    /// Login deadline
    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }

    fn timeouts_differ(&self, other: &Self) -> bool {
        let mut a = self.clone();
        a.server_addr = other.server_addr.clone();
        a != *other
    }
}

/// Frame codec configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Minimum payload size to attempt compression (bytes)
    pub compression_threshold: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
        }
    }
}

/// Media service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Base URL of the media service
    pub base_url: String,

    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BotConfiguration::default();
        assert_eq!(config.network.server_addr, "127.0.0.1:8080");
        assert_eq!(config.network.heartbeat_miss_threshold, 3);
        assert_eq!(config.codec.compression_threshold, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_partial_toml() {
        let toml = r#"
            [network]
            server_addr = "10.0.0.1:9000"
            request_timeout_ms = 1500

            [logging]
            json = true
        "#;

        let config: BotConfiguration = toml::from_str(toml).unwrap();
        assert_eq!(config.network.server_addr, "10.0.0.1:9000");
        assert_eq!(config.network.request_timeout(), Duration::from_millis(1500));
        assert_eq!(config.network.max_send_retries, 2);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[codec]\ncompression_threshold = 1024\n").unwrap();

        let config = BotConfiguration::from_file(&path).unwrap();
        assert_eq!(config.codec.compression_threshold, 1024);

        std::fs::write(&path, "[network]\nheartbeat_miss_threshold = 0\n").unwrap();
        assert!(matches!(
            BotConfiguration::from_file(&path),
            Err(BotError::Config(_))
        ));
    }

    #[test]
    fn test_merge_prefers_non_default() {
        let mut base = BotConfiguration::default();
        base.network.server_addr = "base:1".to_string();
        base.logging.level = "debug".to_string();

        let mut other = BotConfiguration::default();
        other.codec.compression_threshold = 64;

        let merged = base.merge(other);
        assert_eq!(merged.network.server_addr, "base:1");
        assert_eq!(merged.logging.level, "debug");
        assert_eq!(merged.codec.compression_threshold, 64);
    }

    #[test]
    fn test_default_path() {
        if let Some(path) = BotConfiguration::default_path() {
            assert!(path.ends_with("botwire/config.toml"));
        }
    }
}
