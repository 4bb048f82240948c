//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,

    /// Where rows are stored
    pub data_backend: DataBackend,
    /// Supabase connection, required for the supabase backend
    pub supabase: Option<SupabaseConfig>,
    /// Supabase JWT secret for token verification
    pub jwt_secret: String,

    /// Allowed client origins for CORS (comma-separated in CLIENT_ORIGIN)
    pub client_origin: String,

    /// Page size when the caller gives none
    pub default_page_limit: u32,
    /// Upper bound on the page size
    pub max_page_limit: u32,
    /// Mutating requests allowed per second per caller
    pub write_rate_limit: u32,
    /// Per-request timeout
    pub request_timeout: Duration,
}

/// Supabase project URL and service role key (bypasses RLS - server only!)
#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub url: String,
    pub service_role_key: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataBackend {
    Supabase,
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Render-style PORT wins, then SERVER_ADDR, then the default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(_) => return Err(ConfigError::Invalid("LOG_FORMAT")),
        };

        let data_backend = match lookup("DATA_BACKEND").as_deref() {
            None | Some("supabase") => DataBackend::Supabase,
            Some("memory") => DataBackend::Memory,
            Some(_) => return Err(ConfigError::Invalid("DATA_BACKEND")),
        };

        let supabase = match data_backend {
            DataBackend::Supabase => Some(SupabaseConfig {
                url: lookup("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?,
                service_role_key: lookup("SUPABASE_SERVICE_ROLE_KEY")
                    .ok_or(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"))?,
            }),
            DataBackend::Memory => None,
        };

        let default_page_limit = parse_or(&lookup, "DEFAULT_PAGE_LIMIT", 10u32)?;
        let max_page_limit = parse_or(&lookup, "MAX_PAGE_LIMIT", 100u32)?;
        if default_page_limit == 0 || max_page_limit < default_page_limit {
            return Err(ConfigError::Invalid("DEFAULT_PAGE_LIMIT"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,

            data_backend,
            supabase,
            jwt_secret: lookup("SUPABASE_JWT_SECRET")
                .ok_or(ConfigError::Missing("SUPABASE_JWT_SECRET"))?,

            client_origin: lookup("CLIENT_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),

            default_page_limit,
            max_page_limit,
            write_rate_limit: parse_or(&lookup, "WRITE_RATE_LIMIT", 10u32)?,
            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 30u64)?),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Memory-backed configuration for tests
#[cfg(test)]
pub(crate) fn test_config(jwt_secret: &str) -> Config {
    Config {
        server_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        log_level: "debug".to_string(),
        log_format: LogFormat::Text,
        data_backend: DataBackend::Memory,
        supabase: None,
        jwt_secret: jwt_secret.to_string(),
        client_origin: "http://localhost:3000".to_string(),
        default_page_limit: 10,
        max_page_limit: 100,
        write_rate_limit: 1000,
        request_timeout: Duration::from_secs(5),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_memory_backend_needs_only_jwt_secret() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATA_BACKEND", "memory"),
            ("SUPABASE_JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.data_backend, DataBackend::Memory);
        assert!(config.supabase.is_none());
        assert_eq!(config.server_addr.port(), 8080);
        assert_eq!(config.default_page_limit, 10);
        assert_eq!(config.max_page_limit, 100);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_supabase_backend_requires_credentials() {
        let err = Config::from_lookup(lookup_from(&[("SUPABASE_JWT_SECRET", "secret")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SUPABASE_URL")));
    }

    #[test]
    fn test_port_overrides_server_addr() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATA_BACKEND", "memory"),
            ("SUPABASE_JWT_SECRET", "secret"),
            ("SERVER_ADDR", "127.0.0.1:9000"),
            ("PORT", "4000"),
        ]))
        .unwrap();
        assert_eq!(config.server_addr.port(), 4000);
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATA_BACKEND", "memory"),
            ("SUPABASE_JWT_SECRET", "secret"),
            ("MAX_PAGE_LIMIT", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("MAX_PAGE_LIMIT")));

        let err = Config::from_lookup(lookup_from(&[
            ("DATA_BACKEND", "sqlite"),
            ("SUPABASE_JWT_SECRET", "secret"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("DATA_BACKEND")));
    }
}
