//! Response bodies of the OpenWeatherMap `/weather` and `/forecast` endpoints.
//!
//! Only the fields the collector stores are modeled; serde ignores the rest.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::weather::{CurrentConditions, ForecastSample};
use crate::utils::{decimal_from_f64, round_half_even};

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentMain {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub feels_like: f64,
    pub humidity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CurrentResponse {
    pub main: CurrentMain,
    pub weather: Vec<Condition>,
    pub wind: Wind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastMain {
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastEntry {
    /// Unix seconds.
    pub dt: i64,
    pub main: ForecastMain,
    pub weather: Vec<Condition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub list: Vec<ForecastEntry>,
}

/// A response that parsed as JSON but cannot be turned into domain values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    pub path: String,
    pub message: String,
}

impl ConversionError {
    fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ConversionError {
            path: path.into(),
            message: message.into(),
        }
    }
}

fn first_description(weather: Vec<Condition>, path: &str) -> Result<String, ConversionError> {
    weather
        .into_iter()
        .next()
        .map(|c| c.description)
        .ok_or_else(|| ConversionError::new(path, "empty weather array"))
}

impl TryFrom<CurrentResponse> for CurrentConditions {
    type Error = ConversionError;

    fn try_from(value: CurrentResponse) -> Result<Self, Self::Error> {
        let wind_speed = decimal_from_f64(value.wind.speed)
            .ok_or_else(|| ConversionError::new("wind.speed", format!("not a finite number: {}", value.wind.speed)))?;
        Ok(CurrentConditions {
            temperature: round_half_even(value.main.temp),
            temperature_min: round_half_even(value.main.temp_min),
            temperature_max: round_half_even(value.main.temp_max),
            humidity: value.main.humidity,
            description: first_description(value.weather, "weather")?,
            feels_like: round_half_even(value.main.feels_like),
            wind_speed,
            wind_direction: value.wind.deg,
        })
    }
}

impl ForecastResponse {
    pub fn into_samples(self) -> Result<Vec<ForecastSample>, ConversionError> {
        self.list
            .into_iter()
            .enumerate()
            .map(|(i, entry)| -> Result<ForecastSample, ConversionError> {
                let sample_time = DateTime::<Utc>::from_timestamp(entry.dt, 0)
                    .ok_or_else(|| ConversionError::new(format!("list[{i}].dt"), format!("timestamp out of range: {}", entry.dt)))?;
                Ok(ForecastSample {
                    sample_time,
                    temp_min: entry.main.temp_min,
                    temp_max: entry.main.temp_max,
                    humidity: entry.main.humidity,
                    description: first_description(entry.weather, &format!("list[{i}].weather"))?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::TimeZone;
    use std::str::FromStr;

    fn load_fixture<T: serde::de::DeserializeOwned>(name: &str) -> T {
        let json = std::fs::read_to_string(format!("tests/data/{name}")).expect("fixture present");
        serde_json::from_str(&json).expect("parse fixture")
    }

    #[test]
    fn converts_current_fixture() {
        let resp: CurrentResponse = load_fixture("current.json");
        let current = CurrentConditions::try_from(resp).expect("convert");
        assert_eq!(current.temperature, 72);
        assert_eq!(current.temperature_min, 68);
        assert_eq!(current.temperature_max, 76);
        assert_eq!(current.feels_like, 72);
        assert_eq!(current.humidity, 48);
        assert_eq!(current.description, "scattered clouds");
        assert_eq!(current.wind_speed, BigDecimal::from_str("8.05").unwrap());
        assert_eq!(current.wind_direction, 250);
    }

    #[test]
    fn converts_forecast_fixture() {
        let resp: ForecastResponse = load_fixture("forecast.json");
        let samples = resp.into_samples().expect("convert");
        assert_eq!(samples.len(), 6);
        assert_eq!(samples[0].sample_time, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(samples[0].humidity, 40);
        assert_eq!(samples[0].description, "clear sky");
        assert_eq!(samples[5].description, "light rain");
    }

    #[test]
    fn empty_weather_array_is_rejected() {
        let json = r#"{"main":{"temp":1.0,"temp_min":1.0,"temp_max":1.0,"feels_like":1.0,"humidity":1},
                       "weather":[],"wind":{"speed":1.0,"deg":1}}"#;
        let resp: CurrentResponse = serde_json::from_str(json).unwrap();
        let err = CurrentConditions::try_from(resp).unwrap_err();
        assert_eq!(err.path, "weather");
    }

    #[test]
    fn forecast_entry_without_weather_reports_index() {
        let json = r#"{"list":[
            {"dt":1704067200,"main":{"temp_min":1.0,"temp_max":2.0,"humidity":3},"weather":[{"description":"mist"}]},
            {"dt":1704078000,"main":{"temp_min":1.0,"temp_max":2.0,"humidity":3},"weather":[]}
        ]}"#;
        let resp: ForecastResponse = serde_json::from_str(json).unwrap();
        let err = resp.into_samples().unwrap_err();
        assert_eq!(err.path, "list[1].weather");
    }

    #[test]
    fn empty_forecast_list_is_valid() {
        let resp: ForecastResponse = serde_json::from_str(r#"{"cod":"200","list":[]}"#).unwrap();
        assert!(resp.into_samples().unwrap().is_empty());
    }

    #[test]
    fn missing_list_fails_to_parse() {
        assert!(serde_json::from_str::<ForecastResponse>(r#"{"cod":"200"}"#).is_err());
    }
}
