//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use mcproto::config::{ClientConfig, LoggingConfig, ProtocolConfig, TransportConfig};
use std::time::Duration;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = ProtocolConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
    assert!(config.validate_strict().is_ok());
}

#[test]
fn test_invalid_client_address() {
    let mut config = ProtocolConfig::default();
    config.client.address = "invalid_address".to_string();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Invalid client address")));
}

#[test]
fn test_hostname_address_is_valid() {
    let client = ClientConfig {
        address: "play.example.net:25565".to_string(),
        ..ClientConfig::default()
    };
    assert!(client.validate().is_empty());
}

#[test]
fn test_empty_client_address() {
    let mut config = ProtocolConfig::default();
    config.client.address = String::new();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("cannot be empty")));
}

#[test]
fn test_connection_timeout_bounds() {
    let mut client = ClientConfig::default();
    client.connection_timeout = Duration::from_millis(10);
    assert!(client
        .validate()
        .iter()
        .any(|e| e.contains("Connection timeout too short")));

    client.connection_timeout = Duration::from_secs(600);
    assert!(client
        .validate()
        .iter()
        .any(|e| e.contains("Connection timeout too long")));
}

#[test]
fn test_zero_read_timeout_disables() {
    let client = ClientConfig {
        read_timeout: Duration::ZERO,
        write_timeout: Duration::ZERO,
        ..ClientConfig::default()
    };
    assert!(client.validate().is_empty());

    let client = ClientConfig {
        read_timeout: Duration::from_millis(1),
        ..ClientConfig::default()
    };
    assert!(client.validate().iter().any(|e| e.contains("Read timeout")));
}

#[test]
fn test_negative_threshold_invalid() {
    let transport = TransportConfig {
        compression_threshold: Some(-1),
        ..TransportConfig::default()
    };
    let errors = transport.validate();
    assert!(errors.iter().any(|e| e.contains("Compression threshold")));
}

#[test]
fn test_compression_level_range() {
    let transport = TransportConfig {
        compression_threshold: Some(256),
        compression_level: 12,
    };
    assert!(transport
        .validate()
        .iter()
        .any(|e| e.contains("Invalid compression level")));
}

#[test]
fn test_logging_requires_output() {
    let logging = LoggingConfig {
        log_to_console: false,
        log_to_file: false,
        ..LoggingConfig::default()
    };
    assert!(logging
        .validate()
        .iter()
        .any(|e| e.contains("At least one logging output")));
}

#[test]
fn test_logging_file_needs_path() {
    let logging = LoggingConfig {
        log_to_file: true,
        log_file_path: None,
        ..LoggingConfig::default()
    };
    assert!(!logging.validate().is_empty());
}

#[test]
fn test_validate_strict_lists_every_error() {
    let mut config = ProtocolConfig::default();
    config.client.address = String::new();
    config.transport.compression_level = 42;

    let err = config.validate_strict().unwrap_err();
    let message = err.to_string();
    assert!(message.contains("cannot be empty"));
    assert!(message.contains("compression level"));
}

#[test]
fn test_from_toml_partial() {
    let config = ProtocolConfig::from_toml(
        r#"
        [client]
        address = "10.0.0.5:25570"
        read_timeout = 0

        [transport]
        compression_threshold = 256

        [logging]
        log_level = "debug"
        "#,
    )
    .expect("Partial config should parse");

    assert_eq!(config.client.address, "10.0.0.5:25570");
    assert_eq!(config.client.read_timeout, Duration::ZERO);
    assert_eq!(config.client.connection_timeout, Duration::from_secs(5));
    assert_eq!(config.transport.compression_threshold, Some(256));
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.validate().is_empty());
}

#[test]
fn test_from_toml_rejects_bad_level() {
    let result = ProtocolConfig::from_toml("[logging]\nlog_level = \"loud\"\n");
    assert!(result.is_err());
}

#[test]
fn test_save_and_load_file() {
    let path = std::env::temp_dir().join(format!("mcproto-config-{}.toml", std::process::id()));
    let config = ProtocolConfig::default_with_overrides(|c| {
        c.client.protocol_version = 767;
        c.transport.compression_threshold = Some(512);
    });
    config.save_to_file(&path).expect("Config should save");

    let loaded = ProtocolConfig::from_file(&path).expect("Config should load");
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.client.protocol_version, 767);
    assert_eq!(loaded.transport.compression_threshold, Some(512));
}

#[test]
fn test_missing_file_is_config_error() {
    let err = ProtocolConfig::from_file("/definitely/not/here.toml").unwrap_err();
    assert!(matches!(err, mcproto::ProtocolError::ConfigError(_)));
}

#[test]
fn test_example_config_parses() {
    let text = ProtocolConfig::example_config();
    assert!(text.contains("[client]"));
    let parsed = ProtocolConfig::from_toml(&text).expect("Example config should parse");
    assert!(parsed.validate().is_empty());
}

// The only test in this binary that touches MCPROTO_* variables.
#[test]
fn test_from_env_overrides() {
    std::env::set_var("MCPROTO_ADDRESS", "192.168.1.20:25566");
    std::env::set_var("MCPROTO_READ_TIMEOUT_MS", "1500");
    std::env::set_var("MCPROTO_COMPRESSION_THRESHOLD", "128");
    std::env::set_var("MCPROTO_LOG_LEVEL", "trace");

    let config = ProtocolConfig::from_env().expect("Environment config should load");
    assert_eq!(config.client.address, "192.168.1.20:25566");
    assert_eq!(config.client.read_timeout, Duration::from_millis(1500));
    assert_eq!(config.transport.compression_threshold, Some(128));
    assert_eq!(config.logging.log_level, Level::TRACE);

    std::env::set_var("MCPROTO_COMPRESSION_THRESHOLD", "off");
    let config = ProtocolConfig::from_env().unwrap();
    assert_eq!(config.transport.compression_threshold, None);

    std::env::set_var("MCPROTO_COMPRESSION_THRESHOLD", "-1");
    let err = ProtocolConfig::from_env().unwrap_err();
    assert!(matches!(err, mcproto::ProtocolError::ConfigError(_)));
    assert!(err.to_string().contains("non-negative"));
    std::env::set_var("MCPROTO_COMPRESSION_THRESHOLD", "none");

    std::env::set_var("MCPROTO_READ_TIMEOUT_MS", "soon");
    assert!(ProtocolConfig::from_env().is_err());

    for var in [
        "MCPROTO_ADDRESS",
        "MCPROTO_READ_TIMEOUT_MS",
        "MCPROTO_COMPRESSION_THRESHOLD",
        "MCPROTO_LOG_LEVEL",
    ] {
        std::env::remove_var(var);
    }
}
