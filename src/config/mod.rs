//! Configuration module for the research backend.
//!
//! All configuration is loaded from environment variables with sensible defaults
//! and validated once at startup.

use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite:./data/research.db";
const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;

/// Errors raised while validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported database URL scheme in {0:?} (expected sqlite: or postgres://)")]
    UnsupportedDatabase(String),

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which relational backend the service talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// File-backed SQLite database; `:memory:` selects a private in-memory store.
    Sqlite { path: PathBuf },
    /// Networked PostgreSQL server.
    Postgres { url: String },
}

impl DatabaseConfig {
    /// Parse a `DATABASE_URL` value.
    ///
    /// Accepts `sqlite:<path>`, `sqlite://<path>`, `postgres://…`, `postgresql://…`
    /// or a bare filesystem path. Anything else with a scheme is rejected.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();

        if raw.starts_with("postgres://") || raw.starts_with("postgresql://") {
            return Ok(DatabaseConfig::Postgres {
                url: raw.to_string(),
            });
        }

        if let Some(rest) = raw.strip_prefix("sqlite:") {
            let rest = rest.strip_prefix("//").unwrap_or(rest);
            // Connection parameters are chosen by the pool, not the URL.
            let path = rest.split('?').next().unwrap_or_default();
            if path.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "DATABASE_URL",
                    value: raw.to_string(),
                    reason: "missing SQLite database path".to_string(),
                });
            }
            return Ok(DatabaseConfig::Sqlite { path: path.into() });
        }

        if raw.is_empty() || raw.contains("://") {
            return Err(ConfigError::UnsupportedDatabase(raw.to_string()));
        }

        Ok(DatabaseConfig::Sqlite { path: raw.into() })
    }

    /// Short backend name reported by the health endpoint.
    pub fn kind(&self) -> &'static str {
        match self {
            DatabaseConfig::Sqlite { .. } => "sqlite",
            DatabaseConfig::Postgres { .. } => "postgresql",
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, DatabaseConfig::Sqlite { path } if path.as_os_str() == ":memory:")
    }

    /// URL handed to the sqlx `Any` driver.
    pub fn connection_url(&self) -> String {
        match self {
            DatabaseConfig::Sqlite { .. } if self.is_in_memory() => "sqlite::memory:".to_string(),
            DatabaseConfig::Sqlite { path } => format!("sqlite://{}?mode=rwc", path.display()),
            DatabaseConfig::Postgres { url } => url.clone(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// SMTP submission settings. Present only when both credentials are set.
#[derive(Clone)]
pub struct EmailConfig {
    pub address: String,
    pub password: String,
    pub smtp_host: String,
    pub smtp_port: u16,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("address", &self.address)
            .field("password", &"<redacted>")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .finish()
    }
}

/// Account created at startup when it does not exist yet.
#[derive(Clone)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSeed")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Database backend and location
    pub database: DatabaseConfig,
    /// Maximum pooled database connections
    pub max_connections: u32,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Human-readable or JSON log lines
    pub log_format: LogFormat,
    /// Outbound email; `None` disables the send-email endpoint
    pub email: Option<EmailConfig>,
    /// Optional seed account
    pub admin_seed: Option<AdminSeed>,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database = DatabaseConfig::parse(
            &var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
        )?;

        let max_connections: u32 = parse_or(
            "DATABASE_MAX_CONNECTIONS",
            var("DATABASE_MAX_CONNECTIONS"),
            5,
        )?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let host: IpAddr = parse_or("HOST", var("HOST"), IpAddr::from([127, 0, 0, 1]))?;
        let port: u16 = parse_or("PORT", var("PORT"), 5000)?;

        let log_level = var("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let log_format = match var("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                    reason: "expected text or json".to_string(),
                })
            }
        };

        let email = match (var("EMAIL_ADDRESS"), var("EMAIL_PASSWORD")) {
            (Some(address), Some(password)) => Some(EmailConfig {
                address,
                password,
                smtp_host: var("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                smtp_port: parse_or("SMTP_PORT", var("SMTP_PORT"), DEFAULT_SMTP_PORT)?,
            }),
            _ => None,
        };

        let admin_seed = var("ADMIN_PASSWORD").map(|password| AdminSeed {
            username: var("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            password,
        });

        Ok(Self {
            database,
            max_connections,
            bind_addr: SocketAddr::new(host, port),
            log_level,
            log_format,
            email,
            admin_seed,
        })
    }
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}
