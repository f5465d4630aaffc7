//! Diesel row structs for `weather_current` and `weather_forecast`.
//!
//! Both tables are keyed by collection time, so rows are written with
//! `ON CONFLICT ... DO UPDATE` and never deleted.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use log::warn;

use crate::models::weather::{CurrentReading, DailyForecastSummary};
use crate::schema;

/// Width of the `description` columns, in characters.
pub const DESCRIPTION_MAX_CHARS: usize = 200;

/// Longest prefix of `s` that fits the `description` columns. Clipping is logged.
pub fn clip_description(s: &str) -> &str {
    match s.char_indices().nth(DESCRIPTION_MAX_CHARS) {
        Some((idx, _)) => {
            warn!(
                "Description of {} chars clipped to {}: '{}'",
                s.chars().count(),
                DESCRIPTION_MAX_CHARS,
                s
            );
            &s[..idx]
        }
        None => s,
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable)]
#[diesel(table_name = schema::weather_current)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CurrentWeatherRow {
    pub collection_time: DateTime<Utc>,
    pub temperature: i32,
    pub temperature_min: i32,
    pub temperature_max: i32,
    pub humidity: i32,
    pub description: String,
    pub feels_like: i32,
    pub wind_speed: BigDecimal,
    pub wind_direction: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::weather_current)]
pub struct NewCurrentWeather<'a> {
    pub collection_time: DateTime<Utc>,
    pub temperature: i32,
    pub temperature_min: i32,
    pub temperature_max: i32,
    pub humidity: i32,
    pub description: &'a str,
    pub feels_like: i32,
    pub wind_speed: &'a BigDecimal,
    pub wind_direction: i32,
}

impl<'a> From<&'a CurrentReading> for NewCurrentWeather<'a> {
    fn from(reading: &'a CurrentReading) -> Self {
        let c = &reading.conditions;
        NewCurrentWeather {
            collection_time: reading.collected_at,
            temperature: c.temperature,
            temperature_min: c.temperature_min,
            temperature_max: c.temperature_max,
            humidity: c.humidity,
            description: clip_description(&c.description),
            feels_like: c.feels_like,
            wind_speed: &c.wind_speed,
            wind_direction: c.wind_direction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = schema::weather_forecast)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ForecastDayRow {
    pub collection_time: DateTime<Utc>,
    pub forecast_date: NaiveDate,
    pub temperature_min: i32,
    pub temperature_max: i32,
    pub humidity_min: i32,
    pub humidity_max: i32,
    pub description: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::weather_forecast)]
pub struct NewForecastDay {
    pub collection_time: DateTime<Utc>,
    pub forecast_date: NaiveDate,
    pub temperature_min: i32,
    pub temperature_max: i32,
    pub humidity_min: i32,
    pub humidity_max: i32,
    pub description: String,
}

impl NewForecastDay {
    pub fn new(collected_at: DateTime<Utc>, forecast_date: NaiveDate, summary: &DailyForecastSummary) -> Self {
        let description = summary.description();
        NewForecastDay {
            collection_time: collected_at,
            forecast_date,
            temperature_min: summary.temperature_min,
            temperature_max: summary.temperature_max,
            humidity_min: summary.humidity_min,
            humidity_max: summary.humidity_max,
            description: clip_description(&description).to_string(),
        }
    }
}
