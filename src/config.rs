//! Runtime configuration read from the environment.
//!
//! A `.env` file in the working directory is honoured when present.
//!
//! | Variable | Default |
//! |---|---|
//! | `SERVER_HOST` | `127.0.0.1` |
//! | `SERVER_PORT` | `8080` |
//! | `DATABASE_URL` | unset (in-memory store) |
//! | `CACHE_TTL_SECS` | `600` |

use crate::error::{Error, Result};
use crate::observability::{TtlPolicy, DEFAULT_TTL};
use std::env;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub cache_ttl: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: None,
            cache_ttl: DEFAULT_TTL,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if any) and read the process environment.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` for a port or TTL that does not parse.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let port = match lookup("SERVER_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::ConfigError(format!("SERVER_PORT={:?}: {}", raw, e)))?,
            None => defaults.port,
        };

        let cache_ttl = match lookup("CACHE_TTL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| Error::ConfigError(format!("CACHE_TTL_SECS={:?}: {}", raw, e)))?,
            None => defaults.cache_ttl,
        };

        Ok(AppConfig {
            host: lookup("SERVER_HOST").unwrap_or(defaults.host),
            port,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            cache_ttl,
        })
    }

    /// `host:port`, ready for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn ttl_policy(&self) -> TtlPolicy {
        TtlPolicy::Fixed(self.cache_ttl)
    }
}
