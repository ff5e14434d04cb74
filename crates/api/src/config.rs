//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use domain::{AuthSettings, DomainSettings};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected pretty or json, got {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3333`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `pretty` or `json`
/// - `DATABASE_URL`: PostgreSQL connection string; the in-memory store is
///   used when unset
/// - `DATABASE_MAX_CONNECTIONS` (default 5)
/// - `SESSION_TTL_HOURS` (default 168), `AUTH_LINK_TTL_MINUTES` (default 15)
/// - `AUTH_LINK_BASE_URL`, `AUTH_REDIRECT_URL`
/// - `STORE_TIMEOUT_MS` (default 5000), `PASSWORD_HASH_ITERATIONS` (default 10000)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub session_ttl_hours: i64,
    pub auth_link_ttl_minutes: i64,
    pub auth_link_base_url: String,
    pub auth_redirect_url: String,
    pub store_timeout_ms: u64,
    pub password_hash_iterations: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup` instead of the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let config = Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parsed(&get, "PORT", defaults.port)?,
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parsed(&get, "LOG_FORMAT", defaults.log_format)?,
            database_url: get("DATABASE_URL"),
            database_max_connections: parsed(
                &get,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            )?,
            session_ttl_hours: parsed(&get, "SESSION_TTL_HOURS", defaults.session_ttl_hours)?,
            auth_link_ttl_minutes: parsed(
                &get,
                "AUTH_LINK_TTL_MINUTES",
                defaults.auth_link_ttl_minutes,
            )?,
            auth_link_base_url: get("AUTH_LINK_BASE_URL").unwrap_or(defaults.auth_link_base_url),
            auth_redirect_url: get("AUTH_REDIRECT_URL").unwrap_or(defaults.auth_redirect_url),
            store_timeout_ms: parsed(&get, "STORE_TIMEOUT_MS", defaults.store_timeout_ms)?,
            password_hash_iterations: parsed(
                &get,
                "PASSWORD_HASH_ITERATIONS",
                defaults.password_hash_iterations,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("AUTH_LINK_BASE_URL", &self.auth_link_base_url),
            ("AUTH_REDIRECT_URL", &self.auth_redirect_url),
        ] {
            Url::parse(value).map_err(|e| invalid(name, value, e))?;
        }
        for (name, value) in [
            ("SESSION_TTL_HOURS", self.session_ttl_hours),
            ("AUTH_LINK_TTL_MINUTES", self.auth_link_ttl_minutes),
        ] {
            if value <= 0 {
                return Err(invalid(name, &value.to_string(), "must be positive"));
            }
        }
        if self.password_hash_iterations == 0 {
            return Err(invalid("PASSWORD_HASH_ITERATIONS", "0", "must be positive"));
        }
        if self.database_max_connections == 0 {
            return Err(invalid("DATABASE_MAX_CONNECTIONS", "0", "must be positive"));
        }
        Ok(())
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The settings handed to the domain services.
    pub fn domain_settings(&self) -> DomainSettings {
        DomainSettings {
            auth: AuthSettings {
                session_ttl: chrono::Duration::hours(self.session_ttl_hours),
                link_ttl: chrono::Duration::minutes(self.auth_link_ttl_minutes),
                link_base_url: self.auth_link_base_url.clone(),
                redirect_url: self.auth_redirect_url.clone(),
                password_iterations: self.password_hash_iterations,
            },
            store_timeout: Duration::from_millis(self.store_timeout_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let auth = AuthSettings::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3333,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            database_max_connections: 5,
            session_ttl_hours: auth.session_ttl.num_hours(),
            auth_link_ttl_minutes: auth.link_ttl.num_minutes(),
            auth_link_base_url: auth.link_base_url,
            auth_redirect_url: auth.redirect_url,
            store_timeout_ms: 5000,
            password_hash_iterations: auth.password_iterations,
        }
    }
}

fn parsed<T>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(name, &value, e)),
        None => Ok(default),
    }
}

fn invalid(name: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
