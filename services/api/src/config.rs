//! services/api/src/config.rs
//!
//! Defines the service configuration and its loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use study_hub_core::storage::DEFAULT_CHUNK_SIZE;
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
    pub openai_api_key: Option<String>,
    pub solver_model: String,
    pub storage_root: PathBuf,
    pub public_base_url: String,
    pub upload_chunk_size: usize,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to keep tests hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server and database ---
        let bind_address = parse_var(&lookup, "BIND_ADDRESS", "0.0.0.0:3000")?;

        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Doubt solver (optional) ---
        let openai_api_key = lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty());
        let solver_model = lookup("SOLVER_MODEL").unwrap_or_else(|| "gpt-4o-mini".to_string());

        // --- Object storage ---
        let storage_root = lookup("STORAGE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./storage"));
        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let upload_chunk_size: usize =
            parse_var(&lookup, "UPLOAD_CHUNK_SIZE", &DEFAULT_CHUNK_SIZE.to_string())?;
        if upload_chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "UPLOAD_CHUNK_SIZE".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        // --- HTTP ---
        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:9002".to_string());
        let max_upload_bytes = parse_var(&lookup, "MAX_UPLOAD_BYTES", "10485760")?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            solver_model,
            storage_root,
            public_base_url,
            upload_chunk_size,
            cors_origin,
            max_upload_bytes,
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config =
            Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/hub")]))
                .unwrap();

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.solver_model, "gpt-4o-mini");
        assert_eq!(config.storage_root, PathBuf::from("./storage"));
        assert_eq!(config.upload_chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert!(config.openai_api_key.is_none());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/hub"),
            ("BIND_ADDRESS", "not-an-address"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "BIND_ADDRESS"));

        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/hub"),
            ("UPLOAD_CHUNK_SIZE", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "UPLOAD_CHUNK_SIZE"));
    }

    #[test]
    fn public_base_url_loses_trailing_slash() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/hub"),
            ("PUBLIC_BASE_URL", "https://hub.example.com/"),
            ("OPENAI_API_KEY", "sk-test"),
        ]))
        .unwrap();
        assert_eq!(config.public_base_url, "https://hub.example.com");
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
    }
}
