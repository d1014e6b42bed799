//! Structured logging setup.
//!
//! The library only emits `tracing` events. Applications that want them
//! printed call [`init_logging`] once with their [`LoggingConfig`].

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};

/// Build the filter: `RUST_LOG` wins, otherwise the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string().to_ascii_lowercase()))
}

/// Install a global `tracing` subscriber.
///
/// Fails with a configuration error if the log file cannot be opened or a
/// global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let console_layer = config
        .log_to_console
        .then(|| fmt::layer().with_target(config.with_target));

    let file_layer = match (config.log_to_file, config.log_file_path.as_deref()) {
        (true, Some(path)) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    ProtocolError::ConfigError(format!("Failed to open log file '{path}': {e}"))
                })?;
            Some(
                fmt::layer()
                    .with_target(config.with_target)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        (true, None) => {
            return Err(ProtocolError::ConfigError(
                "log_file_path must be specified when log_to_file is true".to_string(),
            ))
        }
        (false, _) => None,
    };

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ProtocolError::ConfigError(format!("Failed to install logger: {e}")))?;

    info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_path_is_config_error() {
        let config = LoggingConfig {
            log_to_file: true,
            log_file_path: None,
            ..LoggingConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(ProtocolError::ConfigError(_))
        ));
    }
}
