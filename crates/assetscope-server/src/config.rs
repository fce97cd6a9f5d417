//! Configuration management for the assetscope server.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use assetscope_server::config::ServerConfig;
//!
//! // Load from file with env overrides
//! let config = ServerConfig::load("assetscope.yaml")?;
//!
//! // Or load from environment only
//! let config = ServerConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use assetscope_domain::search::SearchConfig;
use assetscope_domain::{AnonymousIdentity, PipelineConfig, DEFAULT_ANONYMOUS_USER};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "ASSETSCOPE";

/// Search backends this build can drive.
pub const SEARCH_BACKENDS: &[&str] = &["memory"];

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Access control settings
    #[serde(default)]
    pub access: AccessSettings,

    /// Full-text search settings
    #[serde(default)]
    pub search: SearchSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Access control settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AccessSettings {
    /// Identifier of the shared identity that public grants are recorded
    /// against.
    ///
    /// Environment variable: `ASSETSCOPE_ACCESS__ANONYMOUS_USER_ID`
    #[serde(default = "default_anonymous_user_id")]
    pub anonymous_user_id: String,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self {
            anonymous_user_id: default_anonymous_user_id(),
        }
    }
}

fn default_anonymous_user_id() -> String {
    DEFAULT_ANONYMOUS_USER.to_string()
}

/// Full-text search settings.
///
/// # Example YAML Configuration
///
/// ```yaml
/// search:
///   backend: memory
///   timeout_ms: 2000
///   grantee_prefilter: true
///   empty_index_fallback: true
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SearchSettings {
    /// Search backend type: "memory"
    #[serde(default = "default_search_backend")]
    pub backend: String,

    /// Upper bound on each index query, in milliseconds.
    ///
    /// Environment variable: `ASSETSCOPE_SEARCH__TIMEOUT_MS`
    #[serde(default = "default_search_timeout_ms")]
    pub timeout_ms: u64,

    /// Restrict index queries to documents granted to the requesting user
    /// when the index carries grantee lists.
    #[serde(default = "default_true")]
    pub grantee_prefilter: bool,

    /// Return the unfiltered visible set when the index holds no document
    /// for the queried type. Set to false to return nothing instead.
    #[serde(default = "default_true")]
    pub empty_index_fallback: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            backend: default_search_backend(),
            timeout_ms: default_search_timeout_ms(),
            grantee_prefilter: true,
            empty_index_fallback: true,
        }
    }
}

fn default_search_backend() -> String {
    "memory".to_string()
}

fn default_search_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `ASSETSCOPE_` and use `__` as
    /// separator. For example:
    /// - `ASSETSCOPE_SEARCH__TIMEOUT_MS=2000` overrides `search.timeout_ms`
    /// - `ASSETSCOPE_LOGGING__LEVEL=debug` overrides `logging.level`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            // ASSETSCOPE_SEARCH__BACKEND -> search.backend
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.access.anonymous_user_id.trim().is_empty() {
            return Err(ConfigLoadError::Invalid {
                message: "access.anonymous_user_id must not be empty".to_string(),
            });
        }

        if !SEARCH_BACKENDS.contains(&self.search.backend.as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "search.backend must be one of: {:?}, got: {}",
                    SEARCH_BACKENDS, self.search.backend
                ),
            });
        }

        if self.search.timeout_ms == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "search.timeout_ms must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }

    /// Settings handed to the request pipeline.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            anonymous: AnonymousIdentity::new(self.access.anonymous_user_id.clone()),
            search: SearchConfig {
                timeout: Duration::from_millis(self.search.timeout_ms),
                grantee_prefilter: self.search.grantee_prefilter,
                empty_index_fallback: self.search.empty_index_fallback,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Test: Can load config from YAML file
    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
access:
  anonymous_user_id: nobody

search:
  backend: memory
  timeout_ms: 250
  grantee_prefilter: false

logging:
  level: debug
  json: true
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.access.anonymous_user_id, "nobody");
        assert_eq!(config.search.backend, "memory");
        assert_eq!(config.search.timeout_ms, 250);
        assert!(!config.search.grantee_prefilter);
        assert!(config.search.empty_index_fallback);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    /// Test: Can override config with env vars
    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
search:
  timeout_ms: 1000
logging:
  level: info
"#
        )
        .unwrap();

        std::env::set_var("ASSETSCOPE_SEARCH__TIMEOUT_MS", "2500");
        std::env::set_var("ASSETSCOPE_LOGGING__LEVEL", "warn");

        let config = ServerConfig::load(file.path());

        std::env::remove_var("ASSETSCOPE_SEARCH__TIMEOUT_MS");
        std::env::remove_var("ASSETSCOPE_LOGGING__LEVEL");

        let config = config.unwrap();
        assert_eq!(config.search.timeout_ms, 2500);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.access.anonymous_user_id, DEFAULT_ANONYMOUS_USER);
    }

    /// Test: Environment alone yields defaults
    #[test]
    #[serial]
    fn test_from_env_uses_defaults() {
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    /// Test: Missing config file is reported
    #[test]
    fn test_missing_file() {
        let err = ServerConfig::load("/nonexistent/assetscope.yaml").unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
    }

    /// Test: Config validation catches errors
    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = ServerConfig::default();
        config.search.backend = "whoosh".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("search.backend"));

        let mut config = ServerConfig::default();
        config.search.timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));

        let mut config = ServerConfig::default();
        config.access.anonymous_user_id = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("anonymous_user_id"));

        let mut config = ServerConfig::default();
        config.logging.level = "invalid".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));

        assert!(ServerConfig::default().validate().is_ok());
    }

    /// Test: Pipeline settings mirror the config
    #[test]
    fn test_pipeline_config() {
        let mut config = ServerConfig::default();
        config.access.anonymous_user_id = "nobody".to_string();
        config.search.timeout_ms = 1500;
        config.search.empty_index_fallback = false;

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.anonymous.id(), "nobody");
        assert_eq!(pipeline.search.timeout, Duration::from_millis(1500));
        assert!(pipeline.search.grantee_prefilter);
        assert!(!pipeline.search.empty_index_fallback);
    }
}
