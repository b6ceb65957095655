//! Configuration management for the Meridian relay.
//!
//! This module handles loading, validation, and conversion of relay
//! configuration from TOML files and command-line arguments.

use relay_server::RelayConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Default authentication window in milliseconds
fn default_auth_timeout_ms() -> u64 {
    4_000
}

/// Default pending-connection backlog
fn default_accept_backlog() -> u32 {
    5
}

/// Default maximum wire frame size in bytes
fn default_max_frame_size() -> usize {
    64 * 1024 // 64KB
}

/// Application configuration loaded from TOML file.
///
/// This is the main configuration structure that encompasses all relay
/// settings including networking, authentication, and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Relay configuration settings
    pub relay: RelaySettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Relay-specific configuration settings.
///
/// Controls network binding, the shared authentication secret, the remote
/// connection policy, and protocol limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Network address to bind the relay to (e.g., "127.0.0.1:8720")
    pub bind_address: String,
    /// Shared secret peers must present to authenticate
    pub secret_key: String,
    /// Whether peers from non-loopback addresses are accepted
    #[serde(default)]
    pub accept_remote_connections: bool,
    /// Authentication window in milliseconds before pending peers are kicked
    #[serde(default = "default_auth_timeout_ms")]
    pub auth_timeout_ms: u64,
    /// Pending-connection backlog for the listening socket
    #[serde(default = "default_accept_backlog")]
    pub accept_backlog: u32,
    /// Maximum size of a single wire frame in bytes
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

/// Logging system configuration.
///
/// Controls log output format, levels, and destination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    pub json_format: bool,
    /// Optional file path for log output (None means stdout only)
    pub file_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            relay: RelaySettings {
                bind_address: "127.0.0.1:8720".to_string(),
                secret_key: "change-me".to_string(),
                accept_remote_connections: false,
                auth_timeout_ms: default_auth_timeout_ms(),
                accept_backlog: default_accept_backlog(),
                max_frame_size: default_max_frame_size(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
                file_path: None,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at
    /// the specified path and returns the default configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded or default configuration, or an error if loading/creation
    /// failed.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config file
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration to a relay configuration.
    ///
    /// This method translates the TOML-based configuration into the types
    /// expected by the relay server core.
    ///
    /// # Returns
    ///
    /// A `RelayConfig` instance ready for use with the relay server.
    pub fn to_relay_config(&self) -> Result<RelayConfig, Box<dyn std::error::Error>> {
        Ok(RelayConfig {
            bind_address: self.relay.bind_address.parse()?,
            secret_key: self.relay.secret_key.clone(),
            accept_remote_connections: self.relay.accept_remote_connections,
            accept_backlog: self.relay.accept_backlog,
            auth_timeout_ms: self.relay.auth_timeout_ms,
            max_frame_size: self.relay.max_frame_size,
        })
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// Checks the bind address, authentication secret, protocol limits, and
    /// log level for validity.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing
    /// the issue.
    pub fn validate(&self) -> Result<(), String> {
        // Validate bind address
        if self.relay.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.relay.bind_address
            ));
        }

        // Peers authenticate against this value; an empty secret would let
        // anyone in.
        if self.relay.secret_key.is_empty() {
            return Err("Secret key cannot be empty".to_string());
        }

        if self.relay.auth_timeout_ms == 0 {
            return Err("relay.auth_timeout_ms must be greater than 0".to_string());
        }

        if self.relay.max_frame_size == 0 {
            return Err("relay.max_frame_size must be greater than 0".to_string());
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;
    use tokio::fs;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        // Test relay settings
        assert_eq!(config.relay.bind_address, "127.0.0.1:8720");
        assert_eq!(config.relay.secret_key, "change-me");
        assert_eq!(config.relay.accept_remote_connections, false);
        assert_eq!(config.relay.auth_timeout_ms, 4_000);
        assert_eq!(config.relay.accept_backlog, 5);
        assert_eq!(config.relay.max_frame_size, 64 * 1024);

        // Test logging settings
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.json_format, false);
        assert!(config.logging.file_path.is_none());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let temp_path = PathBuf::from("nonexistent_meridian_config.toml");

        // Ensure file doesn't exist
        if temp_path.exists() {
            fs::remove_file(&temp_path).await.ok();
        }

        let result = AppConfig::load_from_file(&temp_path).await;
        assert!(result.is_ok());

        let config = result.unwrap();

        // Should return default config
        assert_eq!(config.relay.bind_address, "127.0.0.1:8720");
        assert_eq!(config.relay.auth_timeout_ms, 4_000);

        // Should create the file
        assert!(temp_path.exists());

        // Clean up
        fs::remove_file(&temp_path).await.ok();
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[relay]
bind_address = "0.0.0.0:9100"
secret_key = "hunter2"
accept_remote_connections = true
auth_timeout_ms = 1500
accept_backlog = 16
max_frame_size = 32768

[logging]
level = "debug"
json_format = true
file_path = "/tmp/meridian.log"
"#;

        let temp_file = NamedTempFile::new().unwrap();
        fs::write(temp_file.path(), toml_content).await.unwrap();

        let result = AppConfig::load_from_file(&temp_file.path().to_path_buf()).await;
        assert!(result.is_ok());

        let config = result.unwrap();

        // Verify relay settings
        assert_eq!(config.relay.bind_address, "0.0.0.0:9100");
        assert_eq!(config.relay.secret_key, "hunter2");
        assert_eq!(config.relay.accept_remote_connections, true);
        assert_eq!(config.relay.auth_timeout_ms, 1500);
        assert_eq!(config.relay.accept_backlog, 16);
        assert_eq!(config.relay.max_frame_size, 32768);

        // Verify logging settings
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.json_format, true);
        assert_eq!(
            config.logging.file_path,
            Some("/tmp/meridian.log".to_string())
        );
    }

    #[test]
    fn test_to_relay_config_conversion() {
        let app_config = AppConfig {
            relay: RelaySettings {
                bind_address: "192.168.1.100:9000".to_string(),
                secret_key: "squadron".to_string(),
                accept_remote_connections: true,
                auth_timeout_ms: 2_000,
                accept_backlog: 8,
                max_frame_size: 16 * 1024,
            },
            logging: LoggingSettings {
                level: "warn".to_string(),
                json_format: false,
                file_path: None,
            },
        };

        let relay_config = app_config.to_relay_config().unwrap();

        assert_eq!(relay_config.bind_address.to_string(), "192.168.1.100:9000");
        assert_eq!(relay_config.secret_key, "squadron");
        assert_eq!(relay_config.accept_remote_connections, true);
        assert_eq!(relay_config.auth_timeout_ms, 2_000);
        assert_eq!(relay_config.accept_backlog, 8);
        assert_eq!(relay_config.max_frame_size, 16 * 1024);
    }

    #[test]
    fn test_validation_valid_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_bind_address() {
        let mut config = AppConfig::default();
        config.relay.bind_address = "invalid_address".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid bind address"));
    }

    #[test]
    fn test_validation_empty_secret_key() {
        let mut config = AppConfig::default();
        config.relay.secret_key = "".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Secret key cannot be empty"));
    }

    #[test]
    fn test_validation_invalid_log_level() {
        let mut config = AppConfig::default();
        config.logging.level = "invalid_level".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid log level"));
    }

    #[test]
    fn test_validation_valid_log_levels() {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];

        for level in &valid_levels {
            let mut config = AppConfig::default();
            config.logging.level = level.to_string();

            let result = config.validate();
            assert!(result.is_ok(), "Level '{}' should be valid", level);
        }
    }

    #[test]
    fn test_serde_deserialization_with_defaults() {
        let toml_content = r#"
[relay]
bind_address = "127.0.0.1:8720"
secret_key = "hunter2"

[logging]
level = "info"
json_format = false
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();

        // Should use default values for missing fields
        assert_eq!(config.relay.accept_remote_connections, false);
        assert_eq!(config.relay.auth_timeout_ms, 4_000);
        assert_eq!(config.relay.accept_backlog, 5);
        assert_eq!(config.relay.max_frame_size, 64 * 1024);
        assert!(config.logging.file_path.is_none());
    }

    #[test]
    fn test_edge_case_configurations() {
        // Test very short auth window
        let mut config = AppConfig::default();
        config.relay.auth_timeout_ms = 1;
        assert!(config.validate().is_ok());

        // Test very long auth window
        config.relay.auth_timeout_ms = 86_400_000; // 24 hours
        assert!(config.validate().is_ok());

        // Test single-connection backlog
        config.relay.accept_backlog = 1;
        assert!(config.validate().is_ok());

        // Zero auth window is rejected
        config.relay.auth_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_cloning() {
        let config = AppConfig::default();
        let cloned_config = config.clone();

        assert_eq!(config.relay.bind_address, cloned_config.relay.bind_address);
        assert_eq!(config.relay.secret_key, cloned_config.relay.secret_key);
        assert_eq!(config.logging.level, cloned_config.logging.level);
    }
}
