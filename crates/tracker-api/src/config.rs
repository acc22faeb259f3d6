//! Server configuration from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | `postgres://localhost/tracker` |
//! | `HOST` / `PORT` | `0.0.0.0` / `3001` |
//! | `JWT_SECRET` | required |
//! | `ALLOWED_ORIGINS` | `http://localhost:5173,http://localhost:3000` |
//! | `REALTIME_KEEPALIVE_SECS` | 25 |
//! | `REALTIME_SINK_BUFFER` | 64 |
//! | `DB_MAX_CONNECTIONS` | 10 |

use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use tracing::warn;

use tracker_core::{defaults, Error, Result};
use tracker_db::pool::DEFAULT_MAX_CONNECTIONS;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/tracker";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// Settings for live subscriptions.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    pub keepalive: Duration,
    pub sink_buffer: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            keepalive: Duration::from_secs(defaults::REALTIME_KEEPALIVE_SECS),
            sink_buffer: defaults::REALTIME_SINK_BUFFER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub allowed_origins: Vec<HeaderValue>,
    pub db_max_connections: u32,
    pub realtime: RealtimeConfig,
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, so tests can supply a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::Config("JWT_SECRET environment variable is not set".into()))?;

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            host: lookup("HOST").unwrap_or_else(|| defaults::SERVER_HOST.to_string()),
            port: parse_or("PORT", lookup("PORT"), defaults::SERVER_PORT),
            jwt_secret,
            allowed_origins: parse_allowed_origins(
                lookup("ALLOWED_ORIGINS").as_deref().unwrap_or(DEFAULT_ALLOWED_ORIGINS),
            ),
            db_max_connections: parse_or(
                "DB_MAX_CONNECTIONS",
                lookup("DB_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            ),
            realtime: RealtimeConfig {
                keepalive: Duration::from_secs(parse_or(
                    "REALTIME_KEEPALIVE_SECS",
                    lookup("REALTIME_KEEPALIVE_SECS"),
                    defaults::REALTIME_KEEPALIVE_SECS,
                )),
                sink_buffer: parse_or(
                    "REALTIME_SINK_BUFFER",
                    lookup("REALTIME_SINK_BUFFER"),
                    defaults::REALTIME_SINK_BUFFER,
                )
                .max(1),
            },
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse a numeric setting; an invalid value logs a warning and uses `default`.
fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Display,
{
    match raw {
        None => default,
        Some(value) => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(key, value = %value, default = %default, "Invalid setting, using default");
                default
            }
        },
    }
}

fn parse_allowed_origins(origins: &str) -> Vec<HeaderValue> {
    origins
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
        .collect()
}
