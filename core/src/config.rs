//! TOML Configuration File Support
//!
//! Client settings come from a TOML file at
//! `$XDG_CONFIG_HOME/anon-chat/config.toml`, environment variables, and
//! command-line overrides.
//!
//! # Configuration Priority
//!
//! Highest first:
//! 1. CLI arguments ([`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [client]
//! server_url = "http://chat.example.com:7070"
//! poll_interval_ms = 3000
//! request_timeout_ms = 10000
//! storage_path = "/home/me/.local/share/anon-chat/storage.json"
//! log_path = "/tmp/anon-chat.log"
//! ```
//!
//! # Environment Variables
//!
//! - `ANON_CHAT_SERVER_URL`
//! - `ANON_CHAT_POLL_INTERVAL_MS`
//! - `ANON_CHAT_REQUEST_TIMEOUT_MS`
//! - `ANON_CHAT_STORAGE`
//! - `ANON_CHAT_LOG`

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::{ControllerConfig, DEFAULT_POLL_INTERVAL};
use crate::identity::default_storage_path;

/// Server used when nothing else is configured
pub const DEFAULT_SERVER_URL: &str = "http://localhost:7070";

/// Default HTTP request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where the configuration came from (highest layer that set a value)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// `[client]` section of the TOML file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Chat server base URL
    pub server_url: Option<String>,
    /// Poll period in milliseconds
    pub poll_interval_ms: Option<u64>,
    /// HTTP request timeout in milliseconds
    pub request_timeout_ms: Option<u64>,
    /// Identity storage file
    pub storage_path: Option<PathBuf>,
    /// Log file
    pub log_path: Option<PathBuf>,
}

/// Root of the TOML file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Client settings
    pub client: ClientToml,
}

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Fully resolved client configuration
#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Chat server base URL
    pub server_url: String,
    /// Period between poll ticks
    pub poll_interval: Duration,
    /// HTTP request timeout
    pub request_timeout: Duration,
    /// Identity storage file (`None` when no data directory is known)
    pub storage_path: Option<PathBuf>,
    /// Log file (`None` when no data directory is known)
    pub log_path: Option<PathBuf>,
    /// File the configuration was loaded from
    pub config_file_path: Option<PathBuf>,
    source: ConfigSource,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            storage_path: default_storage_path(),
            log_path: default_log_path(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ChatConfig {
    /// Highest layer that contributed a value
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Controller settings derived from this configuration
    #[must_use]
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            poll_interval: self.poll_interval,
        }
    }

    /// Check values that would make the client misbehave
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for a zero poll interval or
    /// request timeout, or a server URL that is not absolute http(s).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "poll interval must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        let url = reqwest::Url::parse(&self.server_url).map_err(|e| {
            ConfigError::ValidationError(format!("server URL {:?}: {e}", self.server_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "server URL {:?} must use http or https",
                self.server_url
            )));
        }
        Ok(())
    }

    /// Apply CLI overrides (highest priority)
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        let mut touched = false;
        if let Some(url) = &overrides.server_url {
            self.server_url.clone_from(url);
            touched = true;
        }
        if let Some(ms) = overrides.poll_interval_ms {
            self.poll_interval = Duration::from_millis(ms);
            touched = true;
        }
        if let Some(path) = &overrides.storage_path {
            self.storage_path = Some(path.clone());
            touched = true;
        }
        if touched {
            self.source = ConfigSource::Cli;
        }
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/anon-chat/config.toml` or
/// `~/.config/anon-chat/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("anon-chat").join("config.toml"))
}

/// Default log file: `$XDG_DATA_HOME/anon-chat/chat.log`
#[must_use]
pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("anon-chat").join("chat.log"))
}

/// Load configuration from the default file and the environment
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed.
/// A missing config file is not an error (defaults are used).
pub fn load_config() -> Result<ChatConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path and the environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration with an explicit environment lookup
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed.
pub fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ChatConfig, ConfigError> {
    // Start with defaults
    let mut config = ChatConfig::default();

    // Try to load from file
    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ChatToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    // Apply environment variables (overrides file values)
    apply_env_config(&mut config, env);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ChatConfig, toml: &ChatToml) {
    let client = &toml.client;
    if let Some(url) = &client.server_url {
        config.server_url.clone_from(url);
    }
    if let Some(ms) = client.poll_interval_ms {
        config.poll_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = client.request_timeout_ms {
        config.request_timeout = Duration::from_millis(ms);
    }
    if let Some(path) = &client.storage_path {
        config.storage_path = Some(path.clone());
    }
    if let Some(path) = &client.log_path {
        config.log_path = Some(path.clone());
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut ChatConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(url) = env("ANON_CHAT_SERVER_URL") {
        config.server_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(interval) = env("ANON_CHAT_POLL_INTERVAL_MS") {
        match interval.parse::<u64>() {
            Ok(ms) => {
                config.poll_interval = Duration::from_millis(ms);
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %interval, "Ignoring invalid ANON_CHAT_POLL_INTERVAL_MS"),
        }
    }
    if let Some(timeout) = env("ANON_CHAT_REQUEST_TIMEOUT_MS") {
        match timeout.parse::<u64>() {
            Ok(ms) => {
                config.request_timeout = Duration::from_millis(ms);
                config.source = ConfigSource::Env;
            }
            Err(_) => tracing::warn!(value = %timeout, "Ignoring invalid ANON_CHAT_REQUEST_TIMEOUT_MS"),
        }
    }
    if let Some(path) = env("ANON_CHAT_STORAGE") {
        config.storage_path = Some(PathBuf::from(path));
        config.source = ConfigSource::Env;
    }
    if let Some(path) = env("ANON_CHAT_LOG") {
        config.log_path = Some(PathBuf::from(path));
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Command-line overrides, applied after [`load_config`]
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Server URL override
    pub server_url: Option<String>,
    /// Poll interval override (milliseconds)
    pub poll_interval_ms: Option<u64>,
    /// Storage file override
    pub storage_path: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set server URL override
    #[must_use]
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    /// Set poll interval override
    #[must_use]
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = Some(ms);
        self
    }

    /// Set storage file override
    #[must_use]
    pub fn with_storage_path(mut self, path: PathBuf) -> Self {
        self.storage_path = Some(path);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::io::Write;

    use tempfile::NamedTempFile;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let config = ChatConfig::default();

        assert_eq!(config.server_url, "http://localhost:7070");
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_config_path() {
        if let Some(p) = default_config_path() {
            assert!(p.to_string_lossy().contains("anon-chat"));
            assert!(p.to_string_lossy().ends_with("config.toml"));
        }
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            load_config_with_env(Some(dir.path().join("absent.toml")), no_env).unwrap();
        assert_eq!(config.server_url, DEFAULT_SERVER_URL);
        assert_eq!(config.source(), ConfigSource::Default);
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_parse_partial_toml() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
[client]
server_url = "http://chat.example.com:9000"
poll_interval_ms = 1500
"#,
        )
        .unwrap();

        let config = load_config_with_env(Some(file.path().to_path_buf()), no_env).unwrap();

        assert_eq!(config.server_url, "http://chat.example.com:9000");
        assert_eq!(config.poll_interval, Duration::from_millis(1500));
        // Unspecified values keep defaults
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.source(), ConfigSource::File);
        assert_eq!(config.config_file_path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[client\nserver_url = ").unwrap();

        let result = load_config_with_env(Some(file.path().to_path_buf()), no_env);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_env_overrides_file_and_cli_overrides_env() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[client]\nserver_url = \"http://file:1\"\npoll_interval_ms = 100\n")
            .unwrap();

        let env: HashMap<&str, &str> = [
            ("ANON_CHAT_SERVER_URL", "http://env:2"),
            ("ANON_CHAT_POLL_INTERVAL_MS", "not-a-number"),
            ("ANON_CHAT_STORAGE", "/tmp/env-storage.json"),
        ]
        .into_iter()
        .collect();

        let mut config = load_config_with_env(Some(file.path().to_path_buf()), |k| {
            env.get(k).map(|v| (*v).to_string())
        })
        .unwrap();

        assert_eq!(config.server_url, "http://env:2");
        // Invalid env value is ignored, file value stays
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(
            config.storage_path,
            Some(PathBuf::from("/tmp/env-storage.json"))
        );
        assert_eq!(config.source(), ConfigSource::Env);

        config.apply_overrides(&ConfigOverrides::new().with_server_url("http://cli:3"));
        assert_eq!(config.server_url, "http://cli:3");
        assert_eq!(config.source(), ConfigSource::Cli);
    }

    #[test]
    fn test_empty_overrides_keep_source() {
        let mut config = ChatConfig::default();
        config.apply_overrides(&ConfigOverrides::new());
        assert_eq!(config.source(), ConfigSource::Default);
    }

    #[test]
    fn test_validation() {
        let mut config = ChatConfig::default();
        config.poll_interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = ChatConfig::default();
        config.server_url = "ws://localhost:7070".to_string();
        assert!(config.validate().is_err());

        let mut config = ChatConfig::default();
        config.server_url = "nonsense".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_controller_config() {
        let mut config = ChatConfig::default();
        config.apply_overrides(&ConfigOverrides::new().with_poll_interval_ms(250));
        assert_eq!(
            config.controller_config().poll_interval,
            Duration::from_millis(250)
        );
    }
}
