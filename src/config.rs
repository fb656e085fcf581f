//! Configuration for the Frontdesk server
//!
//! TOML format in `.frontdesk/config.toml`:
//!
//! ```toml
//! [server]
//! addr = "127.0.0.1:3000"
//! event_capacity = 1000
//!
//! [database]
//! path = "/var/lib/frontdesk/frontdesk.db"
//! # url = "libsql://frontdesk.example.turso.io"
//!
//! [agent]
//! business_name = "Beauty Salon"
//! reply_delay_ms = 500
//! ```
//!
//! Remote database credentials never live in the file; the token is read from
//! `FRONTDESK_DB_TOKEN`.

use crate::error::{FrontdeskError, Result};
use crate::storage::libsql::ConnectionMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the local database path
pub const DB_PATH_ENV: &str = "FRONTDESK_DB_PATH";
/// Environment variable holding a remote database URL
pub const DB_URL_ENV: &str = "FRONTDESK_DB_URL";
/// Environment variable holding the remote database auth token
pub const DB_TOKEN_ENV: &str = "FRONTDESK_DB_TOKEN";

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrontdeskConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub agent: AgentSettings,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Listen address
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Change-notification channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Database location
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Local database file
    #[serde(default)]
    pub path: Option<String>,

    /// Remote libSQL URL; takes precedence over `path` when set
    #[serde(default)]
    pub url: Option<String>,
}

/// Simulated agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    /// Business name used in the greeting
    #[serde(default = "default_business_name")]
    pub business_name: String,

    /// Pause before the agent replies, in milliseconds
    #[serde(default = "default_reply_delay")]
    pub reply_delay_ms: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            business_name: default_business_name(),
            reply_delay_ms: default_reply_delay(),
        }
    }
}

impl AgentSettings {
    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }
}

fn default_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_event_capacity() -> usize {
    1000
}

fn default_business_name() -> String {
    "Beauty Salon".to_string()
}

fn default_reply_delay() -> u64 {
    500
}

impl FrontdeskConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Config file not found, using defaults: {:?}", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            FrontdeskError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file: {}", e),
            ))
        })?;

        let config: FrontdeskConfig = toml::from_str(&content)
            .map_err(|e| FrontdeskError::Config(format!("Failed to parse config file: {}", e)))?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FrontdeskError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                FrontdeskError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to create config directory: {}", e),
                ))
            })?;
        }

        std::fs::write(path, content).map_err(|e| {
            FrontdeskError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config file: {}", e),
            ))
        })?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config path for the working directory
    pub fn default_path() -> PathBuf {
        PathBuf::from(".frontdesk/config.toml")
    }

    /// Resolve where the backend lives
    ///
    /// Precedence: explicit path > `FRONTDESK_DB_URL` > `FRONTDESK_DB_PATH` >
    /// config file (url, then path) > platform data directory.
    pub fn connection_mode(&self, cli_path: Option<String>) -> Result<ConnectionMode> {
        if let Some(path) = cli_path {
            return Ok(ConnectionMode::Local(path));
        }

        let remote_url = std::env::var(DB_URL_ENV)
            .ok()
            .filter(|url| !url.is_empty())
            .or_else(|| self.database.url.clone());

        if let Some(url) = remote_url {
            let token = std::env::var(DB_TOKEN_ENV).map_err(|_| {
                FrontdeskError::Config(format!(
                    "{} must be set to connect to {}",
                    DB_TOKEN_ENV, url
                ))
            })?;
            return Ok(ConnectionMode::Remote { url, token });
        }

        let path = std::env::var(DB_PATH_ENV)
            .ok()
            .filter(|p| !p.is_empty())
            .or_else(|| self.database.path.clone())
            .unwrap_or_else(|| default_db_path().to_string_lossy().to_string());

        Ok(ConnectionMode::Local(path))
    }
}

/// Default database path under the platform data directory
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("frontdesk")
        .join("frontdesk.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = FrontdeskConfig::default();

        assert_eq!(config.server.addr, "127.0.0.1:3000");
        assert_eq!(config.server.event_capacity, 1000);
        assert_eq!(config.agent.business_name, "Beauty Salon");
        assert_eq!(config.agent.reply_delay(), Duration::from_millis(500));
        assert!(config.database.path.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = FrontdeskConfig::default();
        config.agent.business_name = "Glow Studio".to_string();
        config.database.path = Some("/tmp/glow.db".to_string());
        config.save(&config_path).unwrap();

        let loaded = FrontdeskConfig::load(&config_path).unwrap();
        assert_eq!(loaded.agent.business_name, "Glow Studio");
        assert_eq!(loaded.database.path.as_deref(), Some("/tmp/glow.db"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: FrontdeskConfig = toml::from_str("[agent]\nreply_delay_ms = 0\n").unwrap();
        assert_eq!(config.agent.reply_delay_ms, 0);
        assert_eq!(config.agent.business_name, "Beauty Salon");
        assert_eq!(config.server.addr, "127.0.0.1:3000");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "[server\naddr = ").unwrap();

        let err = FrontdeskConfig::load(&config_path).unwrap_err();
        assert!(matches!(err, FrontdeskError::Config(_)));
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let config = FrontdeskConfig::load(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.agent.reply_delay_ms, 500);
    }

    #[test]
    fn test_cli_path_wins() {
        let config = FrontdeskConfig::default();
        let mode = config
            .connection_mode(Some("/tmp/explicit.db".to_string()))
            .unwrap();
        assert!(matches!(mode, ConnectionMode::Local(ref p) if p == "/tmp/explicit.db"));
    }
}
