//! # Configuration Management
//!
//! Centralized configuration for connections made with this crate.
//!
//! The core codec takes its parameters explicitly; this module only collects
//! the values an application usually wants to keep in a file: where to
//! connect, stream timeouts, the compression threshold and logging.
//!
//! ## Configuration Sources
//! - TOML files via [`ProtocolConfig::from_file`]
//! - Environment variables prefixed with `MCPROTO_` via [`ProtocolConfig::from_env`]
//! - Direct instantiation with defaults
//!
//! ## Example
//! ```toml
//! [client]
//! address = "127.0.0.1:25565"
//! connection_timeout = 5000
//! read_timeout = 30000
//! write_timeout = 30000
//! protocol_version = 772
//!
//! [transport]
//! compression_threshold = 256
//! compression_level = 6
//!
//! [logging]
//! app_name = "mcproto"
//! log_level = "info"
//! ```

use crate::error::{ProtocolError, Result};
use crate::utils::compression::DEFAULT_COMPRESSION_LEVEL;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Protocol version announced in the handshake by default (Minecraft 1.21.8).
pub const DEFAULT_PROTOCOL_VERSION: u32 = 772;

/// Default port of a Minecraft server.
pub const DEFAULT_PORT: u16 = 25565;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProtocolConfig {
    /// Client-side connection settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Framing settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProtocolConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    ///
    /// Unset variables keep their defaults. A variable that is set but cannot
    /// be parsed is an error.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("MCPROTO_ADDRESS") {
            config.client.address = addr;
        }

        if let Some(ms) = env_parse::<u64>("MCPROTO_CONNECTION_TIMEOUT_MS")? {
            config.client.connection_timeout = Duration::from_millis(ms);
        }

        if let Some(ms) = env_parse::<u64>("MCPROTO_READ_TIMEOUT_MS")? {
            config.client.read_timeout = Duration::from_millis(ms);
        }

        if let Some(ms) = env_parse::<u64>("MCPROTO_WRITE_TIMEOUT_MS")? {
            config.client.write_timeout = Duration::from_millis(ms);
        }

        if let Some(version) = env_parse::<u32>("MCPROTO_PROTOCOL_VERSION")? {
            config.client.protocol_version = version;
        }

        if let Ok(threshold) = std::env::var("MCPROTO_COMPRESSION_THRESHOLD") {
            // Only "off" or "none" disables compression
            config.transport.compression_threshold = match threshold.trim() {
                "" | "off" | "none" => None,
                value => match value.parse::<i32>() {
                    Ok(t) if t >= 0 => Some(t),
                    Ok(t) => {
                        return Err(ProtocolError::ConfigError(format!(
                            "Invalid MCPROTO_COMPRESSION_THRESHOLD '{t}': must be non-negative, use 'off' to disable"
                        )))
                    }
                    Err(e) => {
                        return Err(ProtocolError::ConfigError(format!(
                            "Invalid MCPROTO_COMPRESSION_THRESHOLD '{value}': {e}"
                        )))
                    }
                },
            };
        }

        if let Some(level) = env_parse::<u32>("MCPROTO_COMPRESSION_LEVEL")? {
            config.transport.compression_level = level;
        }

        if let Some(level) = env_parse::<Level>("MCPROTO_LOG_LEVEL")? {
            config.logging.log_level = level;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.client.validate());
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ProtocolError::ConfigError(format!("Invalid {name} '{raw}': {e}"))),
        Err(_) => Ok(None),
    }
}

/// Client-side connection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Target server as `host:port`
    pub address: String,

    /// Timeout for the TCP connect
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,

    /// Read timeout applied to the socket; zero disables it
    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,

    /// Write timeout applied to the socket; zero disables it
    #[serde(with = "duration_serde")]
    pub write_timeout: Duration,

    /// Protocol version sent in the handshake
    pub protocol_version: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{DEFAULT_PORT}"),
            connection_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
            protocol_version: DEFAULT_PROTOCOL_VERSION,
        }
    }
}

impl ClientConfig {
    /// Split the address into host and port.
    pub fn host_port(&self) -> Option<(&str, u16)> {
        let (host, port) = self.address.rsplit_once(':')?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return None;
        }
        port.parse().ok().map(|port| (host, port))
    }

    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Client address cannot be empty".to_string());
        } else if self.host_port().is_none() {
            errors.push(format!(
                "Invalid client address format: '{}' (expected format: 'mc.example.com:25565')",
                self.address
            ));
        }

        if self.connection_timeout.as_millis() < 100 {
            errors.push("Connection timeout too short (minimum: 100ms)".to_string());
        } else if self.connection_timeout.as_secs() > 300 {
            errors.push("Connection timeout too long (maximum: 300s)".to_string());
        }

        if !self.read_timeout.is_zero() && self.read_timeout.as_millis() < 10 {
            errors.push("Read timeout too short (minimum: 10ms, or 0 to disable)".to_string());
        }

        if !self.write_timeout.is_zero() && self.write_timeout.as_millis() < 10 {
            errors.push("Write timeout too short (minimum: 10ms, or 0 to disable)".to_string());
        }

        errors
    }
}

/// Framing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Compression threshold in bytes; absent means compression is off
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_threshold: Option<i32>,

    /// zlib level used when compressing (0-9)
    pub compression_level: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            compression_threshold: None,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(threshold) = self.compression_threshold {
            if threshold < 0 {
                errors.push(format!(
                    "Compression threshold must be >= 0 or omitted, got {threshold}"
                ));
            } else if threshold as usize > crate::core::MAX_UNCOMPRESSED_LENGTH {
                errors.push(format!(
                    "Compression threshold {threshold} exceeds the maximum packet size; omit it to disable compression"
                ));
            }
        }

        if self.compression_level > 9 {
            errors.push(format!(
                "Invalid compression level: {} (valid range: 0-9)",
                self.compression_level
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,

    /// Whether to include the event target (module path) in log lines
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("mcproto"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            with_target: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
