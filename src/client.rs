//! Blocking HTTP client for the OpenWeatherMap 2.5 API (`/weather` and `/forecast`).
//!
//! - Uses `ureq` with a shared agent and a global per-request timeout.
//! - Non-2xx statuses are reported with their body, never retried.
//! - Payloads are decoded with `serde_path_to_error` so failures name the offending field.

use http::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::models::openweather::{ConversionError, CurrentResponse, ForecastResponse};
use crate::models::weather::{CurrentConditions, ForecastSample, Units};

pub const DEFAULT_BASE_URL: &str = "http://api.openweathermap.org/data/2.5/";

#[derive(Debug)]
pub enum FetchError {
    Transport(String),
    Http { status: u16, message: String },
    Decode { path: String, message: String },
}

impl core::fmt::Display for FetchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FetchError::Transport(s) => write!(f, "transport error: {}", s),
            FetchError::Http { status, message } => write!(f, "http {}: {}", status, message),
            FetchError::Decode { path, message } => write!(f, "decode error at '{}': {}", path, message),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<ureq::Error> for FetchError {
    fn from(value: ureq::Error) -> Self {
        FetchError::Transport(value.to_string())
    }
}

impl From<ConversionError> for FetchError {
    fn from(value: ConversionError) -> Self {
        FetchError::Decode {
            path: value.path,
            message: value.message,
        }
    }
}

/// Source of current conditions and hourly forecasts for a point.
pub trait WeatherSource {
    fn fetch_current(&self, lat: f64, lon: f64, units: Units) -> Result<CurrentConditions, FetchError>;
    fn fetch_forecast(&self, lat: f64, lon: f64, units: Units) -> Result<Vec<ForecastSample>, FetchError>;
}

pub struct OpenWeatherClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        OpenWeatherClient {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        endpoint_url(&self.base_url, endpoint)
    }

    fn get_json<T: DeserializeOwned>(&self, endpoint: &str, lat: f64, lon: f64, units: Units) -> Result<T, FetchError> {
        let url = self.url(endpoint);
        let mut res = self
            .agent
            .get(&url)
            .header("Accept", "application/json")
            .query("lat", lat.to_string())
            .query("lon", lon.to_string())
            .query("units", units.as_str())
            .query("appid", &self.api_key)
            .call()?;

        let status: StatusCode = res.status();
        let body = res.body_mut().read_to_string()?;
        if !status.is_success() {
            return Err(http_error(status, body));
        }

        decode_json(&body)
    }
}

impl WeatherSource for OpenWeatherClient {
    fn fetch_current(&self, lat: f64, lon: f64, units: Units) -> Result<CurrentConditions, FetchError> {
        let resp: CurrentResponse = self.get_json("weather", lat, lon, units)?;
        Ok(CurrentConditions::try_from(resp)?)
    }

    fn fetch_forecast(&self, lat: f64, lon: f64, units: Units) -> Result<Vec<ForecastSample>, FetchError> {
        let resp: ForecastResponse = self.get_json("forecast", lat, lon, units)?;
        Ok(resp.into_samples()?)
    }
}

fn endpoint_url(base_url: &str, endpoint: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), endpoint.trim_start_matches('/'))
}

fn http_error(status: StatusCode, body: String) -> FetchError {
    let message = if body.trim().is_empty() { String::from("<no body>") } else { body };
    FetchError::Http {
        status: status.as_u16(),
        message,
    }
}

fn decode_json<T: DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(|e| FetchError::Decode {
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })
}
