use std::{str::FromStr, time::Duration};

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env`) at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub admin_jwt_secret: String,
    pub db_max_connections: u32,
    pub operation_timeout: Duration,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

const DEFAULT_DATABASE_URL: &str = "sqlite://reviews.db";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3001;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let admin_jwt_secret = get("ADMIN_JWT_SECRET").ok_or(ConfigError::Missing("ADMIN_JWT_SECRET"))?;
        let timeout_secs: u64 = parse_or(&get, "OPERATION_TIMEOUT_SECS", DEFAULT_OPERATION_TIMEOUT_SECS)?;

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            admin_jwt_secret,
            db_max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            operation_timeout: Duration::from_secs(timeout_secs),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::Invalid { key, value: raw }),
        },
        None => Ok(default),
    }
}
