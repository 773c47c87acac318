use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::codegen::DEFAULT_CODE_LENGTH;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub api_server: ServerConfig,
    pub redirect_server: ServerConfig,
    pub shortener: ShortenerConfig,
    pub geo: GeoConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortenerConfig {
    /// Length of generated codes; custom aliases are not constrained by it.
    pub code_length: usize,
    /// Trailing window within which a repeat click from the same IP on the
    /// same link counts as non-unique.
    pub dedup_window_hours: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    /// Base URL of the IP lookup collaborator (ip-api.com JSON dialect).
    /// Unset disables geography resolution entirely.
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
}

impl ShortenerConfig {
    pub fn dedup_window_secs(&self) -> i64 {
        self.dedup_window_hours as i64 * 3600
    }
}

impl GeoConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://./linkpulse.db".to_string());
        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS", 5u32)?;

        let api_host = std::env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let api_port = env_parse("API_PORT", 8080u16)?;

        let redirect_host =
            std::env::var("REDIRECT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let redirect_port = env_parse("REDIRECT_PORT", 3000u16)?;

        let code_length = env_parse("CODE_LENGTH", DEFAULT_CODE_LENGTH)?;
        let dedup_window_hours = env_parse("DEDUP_WINDOW_HOURS", 24u64)?;

        let geo_endpoint = std::env::var("GEO_API_URL").ok().filter(|v| !v.is_empty());
        let geo_timeout_ms = env_parse(
            "GEO_TIMEOUT_MS",
            crate::geo::DEFAULT_LOOKUP_TIMEOUT.as_millis() as u64,
        )?;

        Ok(Config {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            api_server: ServerConfig {
                host: api_host,
                port: api_port,
            },
            redirect_server: ServerConfig {
                host: redirect_host,
                port: redirect_port,
            },
            shortener: ShortenerConfig {
                code_length,
                dedup_window_hours,
            },
            geo: GeoConfig {
                endpoint: geo_endpoint,
                timeout_ms: geo_timeout_ms,
            },
        })
    }
}

fn env_parse<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {name}: {e}")),
        Err(_) => Ok(default),
    }
}
