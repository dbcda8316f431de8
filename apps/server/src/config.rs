//! Server configuration module.
//!
//! Configuration is resolved in priority order:
//! environment variables > TOML file (path in `TOOLCRIB_CONFIG`) > defaults.
//!
//! ```toml
//! # toolcrib.toml
//! host = "127.0.0.1"
//! port = 8080
//! database_path = "/var/lib/toolcrib/toolcrib.db"
//! history_limit = 50
//! busy_timeout_ms = 5000
//! ```

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;
use serde::Deserialize;

use toolcrib_core::validation::clamp_history_limit;

/// Env var naming the optional TOML file.
pub const CONFIG_PATH_ENV: &str = "TOOLCRIB_CONFIG";

/// Server configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// HTTP port (REST and WebSocket share it)
    pub port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// SQLite pool size
    pub max_connections: u32,

    /// How long a write waits for SQLite's write lock before the request
    /// fails with 503
    pub busy_timeout_ms: u64,

    /// Default number of entries for `GET /api/history`
    pub history_limit: u32,

    /// How far a WebSocket subscriber may lag before skipping topics
    pub notifier_capacity: usize,

    /// tracing `EnvFilter` directive
    pub log_filter: String,
}

/// Every key optional; anything missing falls through to the default.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    database_path: Option<PathBuf>,
    max_connections: Option<u32>,
    busy_timeout_ms: Option<u64>,
    history_limit: Option<u32>,
    notifier_capacity: Option<usize>,
    log_filter: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_path: default_database_path(),
            max_connections: 5,
            busy_timeout_ms: 5_000,
            history_limit: 100,
            notifier_capacity: 256,
            log_filter: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from the process environment and the optional
    /// TOML file it points at.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => Some(std::fs::read_to_string(&path).map_err(|source| {
                ConfigError::ReadFile {
                    path: path.clone(),
                    source,
                }
            })?),
            Err(_) => None,
        };

        Self::from_sources(file.as_deref(), |key| env::var(key).ok())
    }

    /// Resolves configuration from TOML text and an env lookup.
    pub fn from_sources(
        file: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file: FileConfig = match file {
            Some(text) => toml::from_str(text)?,
            None => FileConfig::default(),
        };
        let defaults = ServerConfig::default();

        let config = ServerConfig {
            host: env("HOST").or(file.host).unwrap_or(defaults.host),

            port: parse_env(&env, "PORT")?
                .or(file.port)
                .unwrap_or(defaults.port),

            database_path: env("TOOLCRIB_DB")
                .map(PathBuf::from)
                .or(file.database_path)
                .unwrap_or(defaults.database_path),

            max_connections: parse_env(&env, "TOOLCRIB_DB_MAX_CONNECTIONS")?
                .or(file.max_connections)
                .unwrap_or(defaults.max_connections),

            busy_timeout_ms: parse_env(&env, "TOOLCRIB_DB_BUSY_TIMEOUT_MS")?
                .or(file.busy_timeout_ms)
                .unwrap_or(defaults.busy_timeout_ms),

            history_limit: clamp_history_limit(
                parse_env(&env, "TOOLCRIB_HISTORY_LIMIT")?
                    .or(file.history_limit)
                    .unwrap_or(defaults.history_limit),
            ),

            notifier_capacity: parse_env(&env, "TOOLCRIB_NOTIFIER_CAPACITY")?
                .or(file.notifier_capacity)
                .unwrap_or(defaults.notifier_capacity),

            log_filter: env("RUST_LOG")
                .or(file.log_filter)
                .unwrap_or(defaults.log_filter),
        };

        if config.max_connections == 0 {
            return Err(ConfigError::InvalidValue("max_connections".to_string()));
        }
        if config.notifier_capacity == 0 {
            return Err(ConfigError::InvalidValue("notifier_capacity".to_string()));
        }

        Ok(config)
    }

    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_env<T: std::str::FromStr>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(None),
    }
}

/// Platform data directory, or the working directory when there is none.
fn default_database_path() -> PathBuf {
    ProjectDirs::from("", "", "toolcrib")
        .map(|dirs| dirs.data_dir().join("toolcrib.db"))
        .unwrap_or_else(|| PathBuf::from("./toolcrib.db"))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Cannot read config file {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_sources(None, env_of(&[])).unwrap();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.busy_timeout_ms, 5_000);
        assert_eq!(config.history_limit, 100);
        assert_eq!(config.notifier_capacity, 256);
        assert_eq!(config.log_filter, "info");
        assert!(config.database_path.ends_with("toolcrib.db"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = r#"
            port = 8080
            database_path = "/tmp/tools.db"
            history_limit = 20
            busy_timeout_ms = 250
        "#;
        let config = ServerConfig::from_sources(Some(file), env_of(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_path, PathBuf::from("/tmp/tools.db"));
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.busy_timeout_ms, 250);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_env_overrides_file() {
        let file = "port = 8080\nhost = \"127.0.0.1\"";
        let env = env_of(&[
            ("PORT", "9000"),
            ("RUST_LOG", "toolcrib=debug"),
            ("TOOLCRIB_DB_BUSY_TIMEOUT_MS", "10000"),
        ]);
        let config = ServerConfig::from_sources(Some(file), env).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.busy_timeout_ms, 10_000);
        assert_eq!(config.log_filter, "toolcrib=debug");
    }

    #[test]
    fn test_history_limit_is_clamped() {
        let config =
            ServerConfig::from_sources(None, env_of(&[("TOOLCRIB_HISTORY_LIMIT", "5000")])).unwrap();
        assert_eq!(config.history_limit, 100);
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        let err = ServerConfig::from_sources(None, env_of(&[("PORT", "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key) if key == "PORT"));

        let err = ServerConfig::from_sources(None, env_of(&[("TOOLCRIB_DB_MAX_CONNECTIONS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_bad_file_is_rejected() {
        let err = ServerConfig::from_sources(Some("port = \"x\""), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = ServerConfig::from_sources(Some("colour = 1"), env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
