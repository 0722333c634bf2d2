//! Server configuration loaded from the environment.
//!
//! | Variable | Default | Notes |
//! |---|---|---|
//! | `DATABASE_URL` | (required) | `memory://` selects the in-memory store |
//! | `HOST` | `0.0.0.0` | |
//! | `PORT` | `5000` | |
//! | `CLIENT_ORIGIN` | `http://localhost:3000` | comma-separated CORS allow-list |
//! | `APP_ENV` | `development` | `development`, `production` or `test` |
//! | `DB_MAX_CONNECTIONS` | `10` | |
//! | `SHUTDOWN_GRACE_SECS` | `10` | |
//! | `RUN_MIGRATIONS` | `true` | |

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Default CORS origin when `CLIENT_ORIGIN` is unset or empty.
pub const DEFAULT_CLIENT_ORIGIN: &str = "http://localhost:3000";

/// `DATABASE_URL` value selecting the in-memory store.
pub const MEMORY_STORE_URL: &str = "memory://";

/// Configuration errors. Any of these is fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    /// Production hides error internals from response bodies.
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "production" => Ok(Environment::Production),
            "test" => Ok(Environment::Test),
            other => Err(format!(
                "expected development, production or test (got '{}')",
                other
            )),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which note store backs the server.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres(String),
    Memory,
}

impl fmt::Debug for StoreBackend {
    // Connection strings carry credentials.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Postgres(_) => f.write_str("Postgres(..)"),
            StoreBackend::Memory => f.write_str("Memory"),
        }
    }
}

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreBackend,
    pub bind_addr: SocketAddr,
    pub allowed_origins: Vec<HeaderValue>,
    pub environment: Environment,
    pub db_max_connections: u32,
    pub shutdown_grace: Duration,
    pub run_migrations: bool,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let store = if database_url.trim() == MEMORY_STORE_URL {
            StoreBackend::Memory
        } else {
            StoreBackend::Postgres(database_url)
        };

        let host = get("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_var("PORT", get("PORT"), 5000)?;
        let bind_addr = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "HOST",
                value: host.clone(),
                reason: e.to_string(),
            })?;

        let environment = match get("APP_ENV") {
            None => Environment::default(),
            Some(value) => value
                .parse()
                .map_err(|reason| ConfigError::Invalid {
                    name: "APP_ENV",
                    value,
                    reason,
                })?,
        };

        let db_max_connections: u32 = parse_var("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 10)?;
        if db_max_connections == 0 {
            return Err(ConfigError::Invalid {
                name: "DB_MAX_CONNECTIONS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        let grace_secs: u64 = parse_var("SHUTDOWN_GRACE_SECS", get("SHUTDOWN_GRACE_SECS"), 10)?;
        let run_migrations = match get("RUN_MIGRATIONS") {
            None => true,
            Some(value) => parse_bool("RUN_MIGRATIONS", value)?,
        };

        Ok(Self {
            store,
            bind_addr,
            allowed_origins: parse_allowed_origins(&get("CLIENT_ORIGIN").unwrap_or_default()),
            environment,
            db_max_connections,
            shutdown_grace: Duration::from_secs(grace_secs),
            run_migrations,
        })
    }
}

fn parse_var<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}

/// Parse a comma-separated CORS origin allow-list.
///
/// Entries that are not valid header values are skipped with a warning. An
/// empty list falls back to [`DEFAULT_CLIENT_ORIGIN`].
pub fn parse_allowed_origins(raw: &str) -> Vec<HeaderValue> {
    let origins: Vec<HeaderValue> = raw
        .split(',')
        .filter_map(|s| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            match trimmed.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Invalid CORS origin '{}': {}", trimmed, e);
                    None
                }
            }
        })
        .collect();

    if origins.is_empty() {
        vec![HeaderValue::from_static(DEFAULT_CLIENT_ORIGIN)]
    } else {
        origins
    }
}
