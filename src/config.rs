//! Runtime configuration read from the environment.
//!
//! `main` loads `.env` with `dotenvy` and then calls [`AppConfig::from_env`].
//! All parsing goes through [`AppConfig::from_lookup`], so tests can feed a
//! map instead of mutating the process environment.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::api::{RateLimitConfig, RouterOptions};
use crate::domain::ConfigError;
use crate::infra::{LogFormat, PostgresConfig};

/// Origins allowed by the CORS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl FromStr for CorsOrigins {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed == "*" {
            return Ok(Self::Any);
        }
        let origins: Vec<String> = trimmed
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if origins.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "CORS_ALLOWED_ORIGINS".to_string(),
                message: "expected '*' or a comma-separated list of origins".to_string(),
            });
        }
        Ok(Self::List(origins))
    }
}

#[derive(Debug)]
pub struct AppConfig {
    pub database_url: SecretString,
    pub host: String,
    pub port: u16,
    pub api_auth_key: Option<SecretString>,
    pub log_format: LogFormat,
    /// `None` when `RATE_LIMIT_ENABLED=false`.
    pub rate_limit: Option<RateLimitConfig>,
    pub cors: CorsOrigins,
    pub database: PostgresConfig,
    pub run_migrations: bool,
    pub request_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let rate_limit_enabled = parse_bool(&get, "RATE_LIMIT_ENABLED", true)?;
        let rate_limit = if rate_limit_enabled {
            let defaults = RateLimitConfig::default();
            Some(RateLimitConfig {
                general_rps: parse_or(&get, "RATE_LIMIT_RPS", defaults.general_rps)?,
                general_burst: parse_or(&get, "RATE_LIMIT_BURST", defaults.general_burst)?,
                ..defaults
            })
        } else {
            None
        };

        let db_defaults = PostgresConfig::default();
        let database = PostgresConfig {
            max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", db_defaults.max_connections)?,
            min_connections: parse_or(&get, "DB_MIN_CONNECTIONS", db_defaults.min_connections)?,
            ..db_defaults
        };
        if database.min_connections > database.max_connections {
            return Err(ConfigError::InvalidValue {
                key: "DB_MIN_CONNECTIONS".to_string(),
                message: format!(
                    "must not exceed DB_MAX_CONNECTIONS ({})",
                    database.max_connections
                ),
            });
        }

        let timeout_secs: u64 = parse_or(&get, "REQUEST_TIMEOUT_SECS", 30)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "REQUEST_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            database_url,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 3000)?,
            api_auth_key: get("API_AUTH_KEY").map(SecretString::from),
            log_format: parse_or(&get, "LOG_FORMAT", LogFormat::Pretty)?,
            rate_limit,
            cors: match get("CORS_ALLOWED_ORIGINS") {
                Some(raw) => raw.parse()?,
                None => CorsOrigins::Any,
            },
            database,
            run_migrations: parse_bool(&get, "RUN_MIGRATIONS", true)?,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// `host:port` for the TCP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            rate_limit: self.rate_limit.clone(),
            cors: self.cors.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

fn parse_bool<G>(get: &G, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("expected a boolean, got '{v}'"),
            }),
        },
    }
}
