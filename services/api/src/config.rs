//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub codeforces_api_base: String,
    pub contest_cache_ttl: Duration,
    pub upstream_timeout: Duration,
    pub ses_region: String,
    /// Sender identity for reminder emails. Required before any dispatch can
    /// happen; checked when the notifier is constructed.
    pub ses_sender: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Upstream API Settings ---
        let codeforces_api_base = std::env::var("CODEFORCES_API_BASE")
            .unwrap_or_else(|_| "https://codeforces.com/api".to_string())
            .trim_end_matches('/')
            .to_string();

        let contest_cache_ttl =
            Duration::from_secs(parse_secs("CONTEST_CACHE_TTL_SECS", 300)?);
        let upstream_timeout = Duration::from_secs(parse_secs("UPSTREAM_TIMEOUT_SECS", 15)?);

        // --- Load Email Delivery Settings ---
        let ses_region =
            std::env::var("AWS_SES_REGION").unwrap_or_else(|_| "us-east-1".to_string());
        let ses_sender = std::env::var("AWS_SES_SENDER").ok().filter(|s| !s.is_empty());

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            codeforces_api_base,
            contest_cache_ttl,
            upstream_timeout,
            ses_region,
            ses_sender,
        })
    }
}

fn parse_secs(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Err(_) => Ok(default),
        Ok(raw) => raw.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(var.to_string(), format!("'{}' is not a number of seconds", raw))
        }),
    }
}
