//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML and carries the
//! server and database sections. Every section defaults sensibly so an empty
//! file is valid. The `DATABASE_URL` environment variable takes precedence
//! over `database.url`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::Error;

/// Environment variable that selects the backing database.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Database used when neither the environment nor the config file name one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://sales_insights.db";

/// Files probed, in order, when no explicit config path is given.
const DEFAULT_CONFIG_PATHS: &[&str] = &["./sales-insights.toml", "./config.toml"];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Read and parse the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Load configuration from `custom_path` if given, otherwise from the
    /// first default location that exists, otherwise return defaults.
    pub fn load_or_default(custom_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = custom_path {
            return Self::load(path);
        }

        for candidate in DEFAULT_CONFIG_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                tracing::debug!("Using config file {}", path.display());
                return Self::load(path);
            }
        }

        tracing::debug!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Apply overrides taken from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_database_url_override(std::env::var(DATABASE_URL_ENV).ok());
    }

    /// Replace `database.url` with `value` unless it is missing or blank.
    pub fn apply_database_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.database.url = Some(url.trim().to_string());
        }
    }

    /// The database URL in effect, falling back to the local SQLite file.
    pub fn database_url(&self) -> &str {
        self.database
            .url
            .as_deref()
            .unwrap_or(DEFAULT_DATABASE_URL)
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.server.host.trim().is_empty() {
            warnings.push("server.host is empty".into());
        }

        if self.database.max_connections == 0 {
            warnings.push("database.max_connections is 0; at least 1 is required".into());
        }

        if self.database.url.is_none() {
            warnings.push(format!(
                "database.url is not set; falling back to {DEFAULT_DATABASE_URL}"
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

/// Database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite://...` or `postgres://...`).
    pub url: Option<String>,
    /// Upper bound on pooled connections.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.database_url(), DEFAULT_DATABASE_URL);
    }

    #[test]
    fn parses_sections() {
        let config = Config::from_toml(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            url = "postgres://sales@db/sales"
            max_connections = 10
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database_url(), "postgres://sales@db/sales");
        assert_eq!(config.database.max_connections, 10);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = Config::from_toml("[server\nport = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_override_wins_over_file() {
        let mut config = Config::from_toml("[database]\nurl = \"sqlite://a.db\"").unwrap();
        config.apply_database_url_override(Some("postgres://prod/sales".into()));
        assert_eq!(config.database_url(), "postgres://prod/sales");
    }

    #[test]
    fn blank_env_override_is_ignored() {
        let mut config = Config::from_toml("[database]\nurl = \"sqlite://a.db\"").unwrap();
        config.apply_database_url_override(Some("   ".into()));
        config.apply_database_url_override(None);
        assert_eq!(config.database_url(), "sqlite://a.db");
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sales-insights.toml");
        std::fs::write(&path, "[server]\nport = 8123\n").unwrap();

        let config = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(config.server.port, 8123);
    }

    #[test]
    fn load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn validate_warnings() {
        let mut config = Config::default();
        let warnings = config.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("database.url"));

        config.server.port = 0;
        config.database.max_connections = 0;
        config.database.url = Some("sqlite::memory:".into());
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
    }
}
