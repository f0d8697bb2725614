//! Application configuration module
//!
//! Settings are layered: built-in defaults, then an optional TOML file named
//! by `CHATGATE_CONFIG`, then environment variables. `JWT_SECRET` has no
//! default and must come from one of the two sources.
//!
//! | Key (env / toml) | Default |
//! |---|---|
//! | `SERVER_PORT` / `server_port` | `3000` |
//! | `DATABASE_URL` / `database_url` | unset (in-memory store) |
//! | `JWT_SECRET` / `jwt_secret` | required |
//! | `STORE_TIMEOUT_MS` / `store_timeout_ms` | `5000` |
//! | `ROOM_CHANNEL_CAPACITY` / `room_channel_capacity` | `256` |
//! | `ROOM_CLEANUP_INTERVAL_SECS` / `room_cleanup_interval_secs` | `300` |

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the optional TOML file
pub const CONFIG_PATH_VAR: &str = "CHATGATE_CONFIG";

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Port the HTTP/WebSocket listener binds on
    pub server_port: u16,
    /// Postgres URL; `None` selects the in-memory store
    pub database_url: Option<String>,
    /// HS256 secret shared with the token issuer
    pub jwt_secret: String,
    /// Upper bound on every store call
    pub store_timeout: Duration,
    /// Buffered events per room before slow subscribers start lagging
    pub room_channel_capacity: usize,
    /// Period of the idle room sweep
    pub room_cleanup_interval: Duration,
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load from `CHATGATE_CONFIG` (if set) and the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_sources(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_sources<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = match lookup(CONFIG_PATH_VAR) {
            Some(path) => AppConfigBuilder::from_file(path)?,
            None => AppConfigBuilder::default(),
        };
        builder = builder.apply_env(&lookup)?;
        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingValue("JWT_SECRET"));
        }
        if let Some(url) = &self.database_url {
            if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
                return Err(ConfigError::InvalidUrl(url.clone()));
            }
        }
        if self.room_channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ROOM_CHANNEL_CAPACITY",
                value: "0".into(),
            });
        }
        if self.store_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "STORE_TIMEOUT_MS",
                value: "0".into(),
            });
        }
        Ok(())
    }
}

/// On-disk shape of the TOML file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    server_port: Option<u16>,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    store_timeout_ms: Option<u64>,
    room_channel_capacity: Option<usize>,
    room_cleanup_interval_secs: Option<u64>,
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    server_port: Option<u16>,
    database_url: Option<String>,
    jwt_secret: Option<String>,
    store_timeout: Option<Duration>,
    room_channel_capacity: Option<usize>,
    room_cleanup_interval: Option<Duration>,
}

impl AppConfigBuilder {
    /// Seed a builder from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&raw)?;
        Ok(Self {
            server_port: file.server_port,
            database_url: file.database_url,
            jwt_secret: file.jwt_secret,
            store_timeout: file.store_timeout_ms.map(Duration::from_millis),
            room_channel_capacity: file.room_channel_capacity,
            room_cleanup_interval: file.room_cleanup_interval_secs.map(Duration::from_secs),
        })
    }

    /// Override fields with whatever `lookup` returns for the env keys
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = parse_var(&lookup, "SERVER_PORT")? {
            self.server_port = Some(port);
        }
        if let Some(url) = lookup("DATABASE_URL").filter(|v| !v.is_empty()) {
            self.database_url = Some(url);
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt_secret = Some(secret);
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "STORE_TIMEOUT_MS")? {
            self.store_timeout = Some(Duration::from_millis(ms));
        }
        if let Some(capacity) = parse_var(&lookup, "ROOM_CHANNEL_CAPACITY")? {
            self.room_channel_capacity = Some(capacity);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "ROOM_CLEANUP_INTERVAL_SECS")? {
            self.room_cleanup_interval = Some(Duration::from_secs(secs));
        }
        Ok(self)
    }

    pub fn server_port(mut self, port: u16) -> Self {
        self.server_port = Some(port);
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    pub fn room_channel_capacity(mut self, capacity: usize) -> Self {
        self.room_channel_capacity = Some(capacity);
        self
    }

    pub fn room_cleanup_interval(mut self, interval: Duration) -> Self {
        self.room_cleanup_interval = Some(interval);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let config = AppConfig {
            server_port: self.server_port.unwrap_or(3000),
            database_url: self.database_url,
            jwt_secret: self.jwt_secret.ok_or(ConfigError::MissingValue("JWT_SECRET"))?,
            store_timeout: self.store_timeout.unwrap_or(Duration::from_secs(5)),
            room_channel_capacity: self.room_channel_capacity.unwrap_or(256),
            room_cleanup_interval: self
                .room_cleanup_interval
                .unwrap_or(Duration::from_secs(300)),
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("failed to read {path:?}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_secret() {
        let config = AppConfig::from_sources(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.database_url, None);
        assert_eq!(config.store_timeout, Duration::from_secs(5));
        assert_eq!(config.room_channel_capacity, 256);
    }

    #[test]
    fn test_missing_secret_is_rejected() {
        let err = AppConfig::from_sources(lookup_from(&[])).unwrap_err();
        assert_matches!(err, ConfigError::MissingValue("JWT_SECRET"));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = AppConfig::from_sources(lookup_from(&[
            ("JWT_SECRET", "s"),
            ("SERVER_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert_matches!(err, ConfigError::InvalidValue { key: "SERVER_PORT", .. });
    }

    #[test]
    fn test_non_postgres_url_is_rejected() {
        let err = AppConfig::builder()
            .jwt_secret("s")
            .database_url("mysql://localhost/chat")
            .build()
            .unwrap_err();
        assert_matches!(err, ConfigError::InvalidUrl(_));
    }

    #[test]
    fn test_file_then_env_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server_port = 4100\njwt_secret = \"from-file\"\nstore_timeout_ms = 250"
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = AppConfig::from_sources(lookup_from(&[
            (CONFIG_PATH_VAR, path.as_str()),
            ("SERVER_PORT", "4200"),
        ]))
        .unwrap();

        assert_eq!(config.server_port, 4200);
        assert_eq!(config.jwt_secret, "from-file");
        assert_eq!(config.store_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_unknown_file_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "jwt_secret = \"x\"\nport = 1").unwrap();
        let err = AppConfigBuilder::from_file(file.path()).unwrap_err();
        assert_matches!(err, ConfigError::Parse(_));
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_reads_process_environment() {
        std::env::remove_var(CONFIG_PATH_VAR);
        std::env::set_var("JWT_SECRET", "process-secret");
        std::env::set_var("ROOM_CHANNEL_CAPACITY", "32");
        let config = AppConfig::from_env();
        std::env::remove_var("JWT_SECRET");
        std::env::remove_var("ROOM_CHANNEL_CAPACITY");

        let config = config.unwrap();
        assert_eq!(config.jwt_secret, "process-secret");
        assert_eq!(config.room_channel_capacity, 32);
    }
}
