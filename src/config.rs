//! Configuration management for Floodgate.
//!
//! Values come from an optional YAML file overlaid with `FLOODGATE_`
//! environment variables, using `__` between nested keys
//! (`FLOODGATE_RATE_LIMITING__MAX_REQUESTS=20`).

use axum::http::HeaderName;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{FloodgateError, Result};
use crate::ratelimit::{Algorithm, LimitConfig, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};

const ENV_PREFIX: &str = "FLOODGATE";

/// Main configuration for the Floodgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FloodgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

/// Where the client key for a request comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeySource {
    /// IP address of the connected peer
    #[default]
    RemoteAddr,
    /// First value of a request header, e.g. `x-forwarded-for` or an
    /// identity header set by an upstream auth layer
    Header { name: String },
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Requests admitted per window
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    #[serde(default)]
    pub algorithm: Algorithm,

    #[serde(default)]
    pub key_source: KeySource,

    #[serde(default)]
    pub eviction: EvictionConfig,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_requests: default_max_requests(),
            algorithm: Algorithm::default(),
            key_source: KeySource::default(),
            eviction: EvictionConfig::default(),
        }
    }
}

fn default_window_secs() -> u64 {
    DEFAULT_WINDOW.as_secs()
}

fn default_max_requests() -> usize {
    DEFAULT_MAX_REQUESTS
}

impl RateLimitingConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Limiter settings derived from this configuration.
    pub fn limit_config(&self) -> LimitConfig {
        LimitConfig {
            window: self.window(),
            max_requests: self.max_requests,
            algorithm: self.algorithm,
        }
    }

    /// How long a client must be silent before its window is evicted.
    pub fn idle_after(&self) -> Result<Duration> {
        self.window()
            .checked_mul(self.eviction.idle_windows)
            .ok_or_else(|| {
                FloodgateError::Config(format!(
                    "rate_limiting.eviction.idle_windows ({}) times window_secs ({}) overflows",
                    self.eviction.idle_windows, self.window_secs
                ))
            })
    }
}

/// Idle client eviction. Off unless enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvictionConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between sweeps
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Idle time, in whole windows, after which a client is forgotten
    #[serde(default = "default_idle_windows")]
    pub idle_windows: u32,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sweep_interval_secs: default_sweep_interval(),
            idle_windows: default_idle_windows(),
        }
    }
}

impl EvictionConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_idle_windows() -> u32 {
    5
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl FloodgateConfig {
    /// Load configuration from an optional file plus the environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: FloodgateConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FloodgateConfig = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the limiter cannot run with.
    pub fn validate(&self) -> Result<()> {
        let rl = &self.rate_limiting;

        if rl.window_secs == 0 {
            return Err(FloodgateError::Config(
                "rate_limiting.window_secs must be greater than zero".to_string(),
            ));
        }
        if rl.max_requests == 0 {
            return Err(FloodgateError::Config(
                "rate_limiting.max_requests must be greater than zero".to_string(),
            ));
        }
        if let KeySource::Header { name } = &rl.key_source {
            if name.trim().is_empty() {
                return Err(FloodgateError::Config(
                    "rate_limiting.key_source.name must not be empty".to_string(),
                ));
            }
            if let Err(e) = HeaderName::from_bytes(name.as_bytes()) {
                return Err(FloodgateError::Config(format!(
                    "rate_limiting.key_source.name {name:?} is not a valid header name: {e}"
                )));
            }
        }
        if rl.eviction.enabled {
            if rl.eviction.sweep_interval_secs == 0 {
                return Err(FloodgateError::Config(
                    "rate_limiting.eviction.sweep_interval_secs must be greater than zero"
                        .to_string(),
                ));
            }
            if rl.eviction.idle_windows == 0 {
                return Err(FloodgateError::Config(
                    "rate_limiting.eviction.idle_windows must be greater than zero".to_string(),
                ));
            }
            rl.idle_after()?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_limits() {
        let config = FloodgateConfig::default();
        assert_eq!(config.rate_limiting.window(), Duration::from_secs(60));
        assert_eq!(config.rate_limiting.max_requests, 10);
        assert_eq!(config.rate_limiting.algorithm, Algorithm::SlidingLog);
        assert_eq!(config.rate_limiting.key_source, KeySource::RemoteAddr);
        assert!(!config.rate_limiting.eviction.enabled);
        assert_eq!(config.server.listen_addr.port(), 8080);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
server:
  listen_addr: "127.0.0.1:9000"
rate_limiting:
  window_secs: 10
  max_requests: 5
  algorithm: fixed_window
  key_source:
    type: header
    name: x-forwarded-for
  eviction:
    enabled: true
    sweep_interval_secs: 30
    idle_windows: 3
logging:
  level: debug
  format: json
"#;
        let config = FloodgateConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.server.listen_addr, "127.0.0.1:9000".parse().unwrap());
        let rl = &config.rate_limiting;
        assert_eq!(
            rl.limit_config(),
            LimitConfig {
                window: Duration::from_secs(10),
                max_requests: 5,
                algorithm: Algorithm::FixedWindow,
            }
        );
        assert_eq!(
            rl.key_source,
            KeySource::Header {
                name: "x-forwarded-for".to_string()
            }
        );
        assert_eq!(rl.eviction.sweep_interval(), Duration::from_secs(30));
        assert_eq!(rl.idle_after().unwrap(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
rate_limiting:
  max_requests: 20
"#;
        let config = FloodgateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.rate_limiting.max_requests, 20);
        assert_eq!(config.rate_limiting.window_secs, 60);
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_zero_window_rejected() {
        let yaml = r#"
rate_limiting:
  window_secs: 0
"#;
        let err = FloodgateConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, FloodgateError::Config(_)));
    }

    #[test]
    fn test_zero_max_requests_rejected() {
        let mut config = FloodgateConfig::default();
        config.rate_limiting.max_requests = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_header_name_rejected() {
        let mut config = FloodgateConfig::default();
        config.rate_limiting.key_source = KeySource::Header {
            name: "  ".to_string(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let mut config = FloodgateConfig::default();
        config.rate_limiting.key_source = KeySource::Header {
            name: "x client id".to_string(),
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, FloodgateError::Config(_)));

        config.rate_limiting.key_source = KeySource::Header {
            name: "X-Client-Id".to_string(),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_eviction_settings_checked_only_when_enabled() {
        let mut config = FloodgateConfig::default();
        config.rate_limiting.eviction.sweep_interval_secs = 0;
        assert!(config.validate().is_ok());

        config.rate_limiting.eviction.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_idle_threshold_overflow_rejected() {
        let mut config = FloodgateConfig::default();
        config.rate_limiting.window_secs = u64::MAX;
        assert!(config.validate().is_ok());

        config.rate_limiting.eviction.enabled = true;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, FloodgateError::Config(_)));
        assert!(config.rate_limiting.idle_after().is_err());

        config.rate_limiting.window_secs = 60;
        config.rate_limiting.eviction.idle_windows = 3;
        assert!(config.validate().is_ok());
        assert_eq!(
            config.rate_limiting.idle_after().unwrap(),
            Duration::from_secs(180)
        );
    }

    #[test]
    fn test_malformed_yaml_is_settings_error() {
        let err = FloodgateConfig::from_yaml("rate_limiting: [unclosed").unwrap_err();
        assert!(matches!(err, FloodgateError::Settings(_)));
    }
}
