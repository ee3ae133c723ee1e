//! Configuration management for bookwarden
//!
//! This module handles loading, parsing, and validating application
//! configuration from YAML files and environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Per-client admission control configuration
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(format!("Failed to read config file: {}", e)))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        // Expand environment variables before parsing
        let expanded = expand_env_vars(yaml);
        serde_yaml::from_str(&expanded)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse YAML: {}", e)))
    }

    /// Load configuration from environment variables with prefix BOOKWARDEN_
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Server config from env
        if let Ok(host) = std::env::var("BOOKWARDEN_SERVER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("BOOKWARDEN_SERVER_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid port number".to_string()))?;
        }

        // Database config from env
        if let Ok(path) = std::env::var("BOOKWARDEN_DATABASE_PATH") {
            config.database.path = path;
        }

        // Auth config from env
        if let Ok(secret) = std::env::var("BOOKWARDEN_JWT_SECRET") {
            config.auth.jwt_secret = Some(secret);
        }
        if let Ok(ttl) = std::env::var("BOOKWARDEN_TOKEN_TTL_HOURS") {
            config.auth.token_ttl_hours = ttl
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid token TTL".to_string()))?;
        }
        if let Ok(skew) = std::env::var("BOOKWARDEN_CLOCK_SKEW_SECS") {
            config.auth.clock_skew_secs = skew
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid clock skew".to_string()))?;
        }

        // Admission config from env
        if let Ok(rate) = std::env::var("BOOKWARDEN_ADMISSION_REFILL_PER_SEC") {
            config.admission.refill_per_sec = rate
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid refill rate".to_string()))?;
        }
        if let Ok(burst) = std::env::var("BOOKWARDEN_ADMISSION_BURST") {
            config.admission.burst = burst
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid burst capacity".to_string()))?;
        }
        if let Ok(interval) = std::env::var("BOOKWARDEN_ADMISSION_SWEEP_INTERVAL_SECS") {
            config.admission.sweep_interval_secs = interval
                .parse()
                .map_err(|_| ConfigError::Parse("Invalid sweep interval".to_string()))?;
        }

        // Logging config from env
        if let Ok(level) = std::env::var("BOOKWARDEN_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("BOOKWARDEN_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Validate the configuration
    ///
    /// A missing signing secret is fatal at startup: the service must not
    /// accept any traffic with a degraded credential gate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.auth.jwt_secret {
            None => Err(ConfigError::MissingRequired(
                "auth.jwt_secret (or BOOKWARDEN_JWT_SECRET)".to_string(),
            )),
            Some(secret) if secret.is_empty() => Err(ConfigError::InvalidValue(
                "auth.jwt_secret must not be empty".to_string(),
            )),
            Some(_) => Ok(()),
        }?;

        if self.auth.token_ttl_hours == 0 {
            return Err(ConfigError::InvalidValue(
                "auth.token_ttl_hours must be positive".to_string(),
            ));
        }

        if self.admission.refill_per_sec <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "admission.refill_per_sec must be positive".to_string(),
            ));
        }
        if self.admission.burst < 1.0 {
            return Err(ConfigError::InvalidValue(
                "admission.burst must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    /// Symmetric signing secret for session tokens
    pub jwt_secret: Option<String>,

    /// Session token lifetime in hours
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: u64,

    /// Clock skew tolerance when checking expiry (in seconds)
    #[serde(default)]
    pub clock_skew_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_hours: default_token_ttl_hours(),
            clock_skew_secs: 0,
        }
    }
}

fn default_token_ttl_hours() -> u64 {
    24
}

/// Per-client admission control configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdmissionConfig {
    /// Permits added to each bucket per second
    #[serde(default = "default_refill_per_sec")]
    pub refill_per_sec: f64,

    /// Maximum permits a bucket may hold
    #[serde(default = "default_burst")]
    pub burst: f64,

    /// Interval between idle-bucket sweeps (in seconds)
    ///
    /// Buckets idle for longer than twice this interval are evicted.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            refill_per_sec: default_refill_per_sec(),
            burst: default_burst(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

fn default_refill_per_sec() -> f64 {
    100.0
}

fn default_burst() -> f64 {
    200.0
}

fn default_sweep_interval() -> u64 {
    60
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "bookwarden.db".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Configuration error types
#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Error reading configuration file
    #[error("Failed to read configuration file: {0}")]
    FileRead(String),

    /// Error parsing configuration
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

/// Expand environment variables in a string
///
/// Supports `${VAR_NAME}` syntax
fn expand_env_vars(input: &str) -> String {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .expect("Invalid regex pattern for environment variable expansion");

    re.replace_all(input, |caps: &regex_lite::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    })
    .into_owned()
}
