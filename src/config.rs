//! Runtime configuration read from the process environment.
//! Defaults target the public OpenWeatherMap endpoint and a local PostgreSQL.

use chrono_tz::Tz;
use std::collections::HashMap;
use std::time::Duration;

use crate::client::DEFAULT_BASE_URL;
use crate::models::weather::Units;

pub const DEFAULT_POSTGRES_PORT: u16 = 5432;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { name: &'static str, reason: String },
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::Missing(name) => write!(f, "environment variable '{}' not set", name),
            ConfigError::Invalid { name, reason } => write!(f, "environment variable '{}' is invalid: {}", name, reason),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub latitude: f64,
    pub longitude: f64,
    pub units: Units,
    /// Full cadence of one cycle, including the time the cycle itself takes.
    pub poll_interval: Duration,
    /// Zone whose calendar days bucket the hourly forecast.
    pub forecast_timezone: Tz,
    pub http_timeout: Duration,
    pub database_url: String,
    /// Create missing tables at startup; when false they must already exist.
    pub create_schema: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key/value source; blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let api_key = require("OPENWEATHER_API_KEY")?;
        let latitude = parse_coordinate("LATITUDE", &require("LATITUDE")?, 90.0)?;
        let longitude = parse_coordinate("LONGITUDE", &require("LONGITUDE")?, 180.0)?;

        let sleep_raw = require("WEATHER_SLEEP_SECONDS")?;
        let poll_interval = sleep_raw
            .parse::<f64>()
            .ok()
            .filter(|s| *s > 0.0)
            .and_then(|s| Duration::try_from_secs_f64(s).ok())
            .ok_or_else(|| ConfigError::Invalid {
                name: "WEATHER_SLEEP_SECONDS",
                reason: format!("expected a positive number of seconds, got '{}'", sleep_raw),
            })?;

        let base_url = get("WEATHER_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let units = match get("WEATHER_UNITS") {
            Some(s) => s.parse::<Units>().map_err(|reason| ConfigError::Invalid {
                name: "WEATHER_UNITS",
                reason,
            })?,
            None => Units::default(),
        };

        let forecast_timezone = match get("FORECAST_TIMEZONE") {
            Some(s) => s.parse::<Tz>().map_err(|_| ConfigError::Invalid {
                name: "FORECAST_TIMEZONE",
                reason: format!("unknown IANA time zone '{}'", s),
            })?,
            None => Tz::UTC,
        };

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(s) => s
                .parse::<u64>()
                .ok()
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| ConfigError::Invalid {
                    name: "HTTP_TIMEOUT_SECS",
                    reason: format!("expected a positive integer, got '{}'", s),
                })?,
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => postgres_url_from_parts(&get)?,
        };

        let create_schema = match get("CREATE_SCHEMA_ON_START") {
            Some(s) => parse_bool(&s).ok_or_else(|| ConfigError::Invalid {
                name: "CREATE_SCHEMA_ON_START",
                reason: format!("expected true/false, got '{}'", s),
            })?,
            None => true,
        };

        Ok(Config {
            api_key,
            base_url,
            latitude,
            longitude,
            units,
            poll_interval,
            forecast_timezone,
            http_timeout,
            database_url,
            create_schema,
        })
    }

    /// Same as `from_lookup`, for tests and callers that hold a map.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| vars.get(name).cloned())
    }
}

fn parse_coordinate(name: &'static str, raw: &str, limit: f64) -> Result<f64, ConfigError> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && v.abs() <= limit)
        .ok_or_else(|| ConfigError::Invalid {
            name,
            reason: format!("expected decimal degrees within ±{}, got '{}'", limit, raw),
        })
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn postgres_url_from_parts<G>(get: &G) -> Result<String, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

    let host = require("POSTGRES_HOST")?;
    let port = match get("POSTGRES_PORT") {
        Some(p) => p.parse::<u16>().map_err(|_| ConfigError::Invalid {
            name: "POSTGRES_PORT",
            reason: format!("expected a port number, got '{}'", p),
        })?,
        None => DEFAULT_POSTGRES_PORT,
    };
    let db = require("POSTGRES_DB")?;
    let user = require("POSTGRES_USER")?;
    let password = require("POSTGRES_PASSWORD")?;

    Ok(format!(
        "postgres://{}:{}@{}:{}/{}",
        percent_encode(&user),
        percent_encode(&password),
        host,
        port,
        percent_encode(&db)
    ))
}

/// Escape everything outside the URL "unreserved" set.
fn percent_encode(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => out.push(b as char),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}
