//! Configuration for the Westeros service.
//!
//! Settings come from three layers:
//! - Default values (embedded in binary)
//! - Configuration file (TOML format)
//! - Environment variable overrides (prefix: `THRONES__`)
//!
//! # Environment Variables
//!
//! - `THRONES__SERVER__PORT=9000`
//! - `THRONES__SERVER__MISSING_PARAMS=empty`
//! - `THRONES__DATABASE__BACKEND=memory`
//! - `THRONES__DATABASE__URL=neo4j://db:7687`
//! - `THRONES__DATABASE__PASSWORD=...`
//! - `THRONES__LOGGING__LEVEL=debug`
//!
//! # Example
//!
//! ```ignore
//! use thrones_storage::config::ThronesConfig;
//!
//! let config = ThronesConfig::load(Some("thrones.toml"))?;
//! println!("Serving on port {}", config.server.port);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "THRONES__";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThronesConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl ThronesConfig {
    /// Loads configuration from an optional file path with environment variable overrides.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (THRONES__*)
    /// 2. Configuration file (if provided)
    /// 3. Built-in defaults
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(file_path) if Path::new(file_path).exists() => {
                let contents = std::fs::read_to_string(file_path)?;
                toml::from_str(&contents)?
            }
            Some(file_path) => {
                return Err(ConfigError::Invalid(format!("configuration file '{}' not found", file_path)));
            }
            None => Self::default(),
        };

        config.apply_overrides_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides looked up by full variable name, e.g. `THRONES__SERVER__PORT`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |section: &str, key: &str| lookup(&format!("{}{}__{}", ENV_PREFIX, section, key));

        // Server overrides
        if let Some(val) = var("SERVER", "PORT") {
            self.server.port = parse_override("SERVER__PORT", &val)?;
        }
        if let Some(val) = var("SERVER", "BIND_ADDRESS") {
            self.server.bind_address = val;
        }
        if let Some(val) = var("SERVER", "STATIC_DIR") {
            self.server.static_dir = val;
        }
        if let Some(val) = var("SERVER", "MISSING_PARAMS") {
            self.server.missing_params = parse_override("SERVER__MISSING_PARAMS", &val)?;
        }

        // Database overrides
        if let Some(val) = var("DATABASE", "BACKEND") {
            self.database.backend = parse_override("DATABASE__BACKEND", &val)?;
        }
        if let Some(val) = var("DATABASE", "URL") {
            self.database.url = val;
        }
        if let Some(val) = var("DATABASE", "USERNAME") {
            self.database.username = val;
        }
        if let Some(val) = var("DATABASE", "PASSWORD") {
            self.database.password = val;
        }
        if let Some(val) = var("DATABASE", "DATABASE") {
            self.database.database = val;
        }
        if let Some(val) = var("DATABASE", "ENGINE_VERSION") {
            self.database.engine_version = val;
        }
        if let Some(val) = var("DATABASE", "QUERY_TIMEOUT_SECS") {
            self.database.query_timeout_secs = parse_override("DATABASE__QUERY_TIMEOUT_SECS", &val)?;
        }
        if let Some(val) = var("DATABASE", "MAX_CONNECTIONS") {
            self.database.max_connections = parse_override("DATABASE__MAX_CONNECTIONS", &val)?;
        }
        if let Some(val) = var("DATABASE", "FIXTURE") {
            self.database.fixture = Some(val).filter(|v| !v.is_empty());
        }

        // Logging overrides
        if let Some(val) = var("LOGGING", "LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = var("LOGGING", "JSON") {
            self.logging.json = val.to_lowercase() == "true" || val == "1";
        }

        Ok(())
    }

    /// Rejects settings the service cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.query_timeout_secs == 0 {
            return Err(ConfigError::Invalid("database.query_timeout_secs must be positive".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be positive".into()));
        }
        if self.database.backend == BackendKind::Neo4j && self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url is required for the neo4j backend".into()));
        }
        if self.database.engine_major().is_none() {
            return Err(ConfigError::Invalid(format!(
                "database.engine_version '{}' does not start with a major version",
                self.database.engine_version
            )));
        }
        Ok(())
    }

    /// Serializes the configuration to TOML format.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Same as [`Self::to_toml`] with the database password masked.
    pub fn to_toml_redacted(&self) -> Result<String, toml::ser::Error> {
        let mut redacted = self.clone();
        if !redacted.database.password.is_empty() {
            redacted.database.password = "********".to_string();
        }
        redacted.to_toml()
    }
}

fn parse_override<T: FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{}{} has invalid value '{}'", ENV_PREFIX, name, raw)))
}

/// How routes answer when a required parameter is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingParamPolicy {
    /// 400 with `MISSING_PARAMETER`.
    #[default]
    Reject,
    /// Degenerate success: `[]` or `""` depending on the route.
    Empty,
}

impl FromStr for MissingParamPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "empty" => Ok(Self::Empty),
            other => Err(format!("unknown missing-parameter policy '{}'", other)),
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub bind_address: String,
    /// Directory served under `/static`
    pub static_dir: String,
    pub missing_params: MissingParamPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_address: "0.0.0.0".to_string(),
            static_dir: "static".to_string(),
            missing_params: MissingParamPolicy::Reject,
        }
    }
}

/// Which graph store the service talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Neo4j,
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "neo4j" => Ok(Self::Neo4j),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown backend '{}'", other)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Neo4j => write!(f, "neo4j"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Graph database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: BackendKind,
    /// Bolt URL of the Neo4j server
    pub url: String,
    pub username: String,
    pub password: String,
    /// Database name, only used by engines that support multiple databases
    pub database: String,
    /// Engine version, e.g. "4" or "3.5"
    pub engine_version: String,
    pub query_timeout_secs: u64,
    /// Upper bound of the driver's connection pool
    pub max_connections: usize,
    /// JSON seed file for the memory backend
    pub fixture: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Neo4j,
            url: "neo4j://localhost:7687".to_string(),
            username: "neo4j".to_string(),
            password: String::new(),
            database: "neo4j".to_string(),
            engine_version: "4".to_string(),
            query_timeout_secs: 10,
            max_connections: 16,
            fixture: None,
        }
    }
}

impl DatabaseConfig {
    /// Major component of `engine_version`.
    pub fn engine_major(&self) -> Option<u32> {
        self.engine_version.trim().split('.').next()?.parse().ok()
    }

    /// Engines from 4 on host several databases and need one selected.
    pub fn selects_database(&self) -> bool {
        self.engine_major().is_some_and(|major| major >= 4)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Use JSON format for log output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
