//! Configuration management for the mudgate server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use mudgate_server::{NegotiationConfig, ServerConfig, StatsConfig, UptimeFormat};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

/// Application configuration loaded from TOML file.
///
/// This is the main configuration structure that encompasses the game listener,
/// the capability handshake, the stats service and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Game listener settings
    pub server: ServerSettings,
    /// Capability handshake settings
    #[serde(default)]
    pub negotiation: NegotiationSettings,
    /// Stats service settings
    #[serde(default)]
    pub stats: StatsSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Game listener configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the game listener to (e.g., "0.0.0.0:4111")
    pub bind_address: String,
    /// Maximum number of registered sessions (0 for no limit)
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Listen backlog for both listeners
    #[serde(default = "default_backlog")]
    pub backlog: u32,
    /// Registry monitor sweep interval in milliseconds (0 to disable)
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,
}

/// Capability handshake configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationSettings {
    /// Bound on each handshake receive, in milliseconds
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
    /// Width used when the client does not report one
    #[serde(default = "default_width")]
    pub default_width: u16,
    /// Height used when the client does not report one
    #[serde(default = "default_height")]
    pub default_height: u16,
}

/// Stats service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSettings {
    /// Whether the stats listener is bound at all
    #[serde(default = "default_stats_enabled")]
    pub enabled: bool,
    /// Network address to bind the stats listener to
    #[serde(default = "default_stats_bind_address")]
    pub bind_address: String,
    /// Whether the reported uptime is the start time or the elapsed time
    #[serde(default)]
    pub uptime_format: UptimeFormat,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

fn default_max_connections() -> usize {
    1000
}

fn default_backlog() -> u32 {
    128
}

fn default_monitor_interval_ms() -> u64 {
    1000
}

fn default_reply_timeout_ms() -> u64 {
    1000
}

fn default_width() -> u16 {
    80
}

fn default_height() -> u16 {
    24
}

fn default_stats_enabled() -> bool {
    true
}

fn default_stats_bind_address() -> String {
    "0.0.0.0:4112".to_string()
}

impl Default for NegotiationSettings {
    fn default() -> Self {
        Self {
            reply_timeout_ms: default_reply_timeout_ms(),
            default_width: default_width(),
            default_height: default_height(),
        }
    }
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            enabled: default_stats_enabled(),
            bind_address: default_stats_bind_address(),
            uptime_format: UptimeFormat::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "0.0.0.0:4111".to_string(),
                max_connections: default_max_connections(),
                backlog: default_backlog(),
                monitor_interval_ms: default_monitor_interval_ms(),
            },
            negotiation: NegotiationSettings::default(),
            stats: StatsSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the application configuration to the library's server configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            backlog: self.server.backlog,
            monitor_interval_ms: self.server.monitor_interval_ms,
            negotiation: NegotiationConfig {
                reply_timeout_ms: self.negotiation.reply_timeout_ms,
                default_width: self.negotiation.default_width,
                default_height: self.negotiation.default_height,
            },
            stats: StatsConfig {
                enabled: self.stats.enabled,
                bind_address: self.stats.bind_address.parse()?,
                uptime_format: self.stats.uptime_format,
            },
        })
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        let Ok(game_addr) = self.server.bind_address.parse::<SocketAddr>() else {
            return Err(format!("Invalid bind address: {}", &self.server.bind_address));
        };

        let Ok(stats_addr) = self.stats.bind_address.parse::<SocketAddr>() else {
            return Err(format!(
                "Invalid stats bind address: {}",
                &self.stats.bind_address
            ));
        };

        // Port 0 asks the OS for a free port, so two of them never clash.
        if self.stats.enabled && game_addr.port() != 0 && game_addr.port() == stats_addr.port() {
            return Err(format!(
                "Game and stats listeners cannot share port {}",
                game_addr.port()
            ));
        }

        if self.server.backlog == 0 {
            return Err("server.backlog must be greater than 0".to_string());
        }

        if self.negotiation.reply_timeout_ms == 0 {
            return Err("negotiation.reply_timeout_ms must be greater than 0".to_string());
        }

        if self.negotiation.default_width == 0 || self.negotiation.default_height == 0 {
            return Err("negotiation default dimensions must be greater than 0".to_string());
        }

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
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.bind_address, "0.0.0.0:4111");
        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.backlog, 128);
        assert_eq!(config.server.monitor_interval_ms, 1000);

        assert_eq!(config.negotiation.reply_timeout_ms, 1000);
        assert_eq!(config.negotiation.default_width, 80);
        assert_eq!(config.negotiation.default_height, 24);

        assert!(config.stats.enabled);
        assert_eq!(config.stats.bind_address, "0.0.0.0:4112");
        assert_eq!(config.stats.uptime_format, UptimeFormat::StartedAt);

        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file_creates_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0:4111");
        assert!(path.exists());

        // The written file must load back to the same settings.
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.stats.bind_address, config.stats.bind_address);
        assert_eq!(reloaded.negotiation.reply_timeout_ms, 1000);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[server]
bind_address = "127.0.0.1:5000"
max_connections = 64
backlog = 16
monitor_interval_ms = 0

[negotiation]
reply_timeout_ms = 250
default_width = 132
default_height = 43

[stats]
enabled = false
bind_address = "127.0.0.1:5001"
uptime_format = "elapsed"

[logging]
level = "debug"
json_format = true
"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&file.path().to_path_buf())
            .await
            .unwrap();

        assert_eq!(config.server.bind_address, "127.0.0.1:5000");
        assert_eq!(config.server.max_connections, 64);
        assert_eq!(config.server.backlog, 16);
        assert_eq!(config.server.monitor_interval_ms, 0);
        assert_eq!(config.negotiation.reply_timeout_ms, 250);
        assert_eq!(config.negotiation.default_width, 132);
        assert_eq!(config.negotiation.default_height, 43);
        assert!(!config.stats.enabled);
        assert_eq!(config.stats.uptime_format, UptimeFormat::Elapsed);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[tokio::test]
    async fn test_load_from_malformed_file_fails() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[server\nbind_address = ").unwrap();

        let result = AppConfig::load_from_file(&file.path().to_path_buf()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_serde_deserialization_with_defaults() {
        let toml_content = r#"
[server]
bind_address = "127.0.0.1:4000"

[logging]
level = "warn"
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();

        assert_eq!(config.server.max_connections, 1000);
        assert_eq!(config.server.backlog, 128);
        assert_eq!(config.server.monitor_interval_ms, 1000);
        assert_eq!(config.negotiation.default_width, 80);
        assert_eq!(config.negotiation.default_height, 24);
        assert!(config.stats.enabled);
        assert_eq!(config.stats.bind_address, "0.0.0.0:4112");
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_to_server_config_conversion() {
        let mut config = AppConfig::default();
        config.server.bind_address = "127.0.0.1:7000".to_string();
        config.stats.uptime_format = UptimeFormat::Elapsed;
        config.negotiation.reply_timeout_ms = 300;

        let server_config = config.to_server_config().unwrap();

        assert_eq!(server_config.bind_address, SocketAddr::from(([127, 0, 0, 1], 7000)));
        assert_eq!(server_config.stats.bind_address, SocketAddr::from(([0, 0, 0, 0], 4112)));
        assert_eq!(server_config.stats.uptime_format, UptimeFormat::Elapsed);
        assert_eq!(server_config.negotiation.reply_timeout_ms, 300);
        assert_eq!(server_config.max_connections, 1000);
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_bind_addresses() {
        let mut config = AppConfig::default();
        config.server.bind_address = "not-an-address".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.stats.bind_address = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_shared_port() {
        let mut config = AppConfig::default();
        config.stats.bind_address = "127.0.0.1:4111".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.contains("4111"));

        // A disabled stats service never binds, so the clash does not matter.
        config.stats.enabled = false;
        assert!(config.validate().is_ok());

        // Ephemeral ports never clash.
        config.stats.enabled = true;
        config.server.bind_address = "127.0.0.1:0".to_string();
        config.stats.bind_address = "127.0.0.1:0".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_values() {
        let mut config = AppConfig::default();
        config.negotiation.reply_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.negotiation.default_height = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.backlog = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_log_levels() {
        let mut config = AppConfig::default();
        for level in ["trace", "debug", "info", "warn", "error"] {
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "level {level} should be valid");
        }

        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }
}
