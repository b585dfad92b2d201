//! Configuration management for aerologix.
//!
//! Configuration is loaded with figment from defaults, a TOML file and the
//! environment, then validated.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "aerologix";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "aerologix.db";

/// Environment variable prefix.
const ENV_PREFIX: &str = "AEROLOGIX_";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `AEROLOGIX_`, sections split by `__`)
/// 2. TOML config file at `~/.config/aerologix/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend API configuration.
    pub api: ApiConfig,
    /// Session tracking configuration.
    pub session: SessionConfig,
    /// Local storage configuration.
    pub storage: StorageConfig,
}

/// Backend API configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the backend, without the `/api` suffix.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub auth_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

/// Session tracking configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interval between elapsed-time refreshes while watching.
    pub tick_interval_ms: u64,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/aerologix/aerologix.db`
    pub database_path: Option<PathBuf>,
    /// Number of submissions shown by `history` when no limit is given.
    pub history_limit: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            auth_token: None,
            timeout_secs: 30,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            history_limit: 20,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment(config_file: &std::path::Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            // Top-level tables are config sections, not figment profiles.
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api.base_url).map_err(|e| Error::ConfigValidation {
            message: format!("invalid api.base_url {:?}: {e}", self.api.base_url),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::ConfigValidation {
                message: format!(
                    "api.base_url must use http or https, got {}",
                    url.scheme()
                ),
            });
        }

        if self.api.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "api.timeout_secs must be greater than 0".to_string(),
            });
        }

        if self.session.tick_interval_ms == 0 {
            return Err(Error::ConfigValidation {
                message: "session.tick_interval_ms must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the tick interval as a Duration.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.session.tick_interval_ms)
    }

    /// Get the request timeout as a Duration.
    #[must_use]
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "aerologix_config_{}_{}.toml",
            name,
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.base_url, "http://localhost:8001");
        assert!(config.api.auth_token.is_none());
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.session.tick_interval_ms, 1000);
        assert!(config.storage.database_path.is_none());
        assert_eq!(config.storage.history_limit, 20);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unparseable_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("api.base_url"));
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let mut config = Config::default();
        config.api.base_url = "ftp://example.com".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("http or https"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_secs = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timeout_secs"));
    }

    #[test]
    fn test_validate_zero_tick_interval() {
        let mut config = Config::default();
        config.session.tick_interval_ms = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("tick_interval_ms"));
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("aerologix"));
        assert!(path.to_string_lossy().ends_with("aerologix.db"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(1000));
        assert_eq!(config.api_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("aerologix"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
        assert_eq!(config.api.timeout_secs, Config::default().api.timeout_secs);
    }

    #[test]
    fn test_load_from_toml_file() {
        let path = write_config(
            "load",
            r#"
            [api]
            base_url = "https://api.aerologix.example"
            auth_token = "secret"

            [storage]
            history_limit = 5
            "#,
        );

        let config = Config::load_from(Some(path.clone())).unwrap();
        assert_eq!(config.api.base_url, "https://api.aerologix.example");
        assert_eq!(config.api.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.storage.history_limit, 5);

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_rejects_invalid_file_values() {
        let path = write_config(
            "invalid",
            r"
            [session]
            tick_interval_ms = 0
            ",
        );

        let err = Config::load_from(Some(path.clone())).unwrap_err();
        assert!(matches!(err, Error::ConfigValidation { .. }));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_config_serializes_to_toml_sections() {
        let json = serde_json::to_value(Config::default()).unwrap();
        assert!(json.get("api").is_some());
        assert!(json.get("session").is_some());
        assert!(json.get("storage").is_some());
    }
}
