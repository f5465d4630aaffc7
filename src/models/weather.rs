//! Domain types shared by the provider client, the aggregator and the store.
//!
//! Temperatures are whole numbers in the unit system requested from the
//! provider; the provider does the conversion, this crate never does.

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use core::fmt;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Unit system passed through to the provider's `units` query parameter.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Units {
    #[default]
    Imperial,
    Metric,
    Standard,
}

impl Units {
    pub fn as_str(self) -> &'static str {
        match self {
            Units::Imperial => "imperial",
            Units::Metric => "metric",
            Units::Standard => "standard",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "imperial" => Ok(Units::Imperial),
            "metric" => Ok(Units::Metric),
            "standard" => Ok(Units::Standard),
            other => Err(format!("unknown unit system '{other}' (expected imperial, metric or standard)")),
        }
    }
}

/// Current conditions as returned by the provider, before a collection time is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub temperature: i32,
    pub temperature_min: i32,
    pub temperature_max: i32,
    pub humidity: i32,
    pub description: String,
    pub feels_like: i32,
    pub wind_speed: BigDecimal,
    pub wind_direction: i32,
}

impl CurrentConditions {
    pub fn collected_at(self, collected_at: DateTime<Utc>) -> CurrentReading {
        CurrentReading {
            collected_at,
            conditions: self,
        }
    }
}

/// One persisted snapshot; `collected_at` is the row key.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentReading {
    pub collected_at: DateTime<Utc>,
    pub conditions: CurrentConditions,
}

/// One hourly forecast entry with raw provider values.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSample {
    pub sample_time: DateTime<Utc>,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: i32,
    pub description: String,
}

/// Aggregated statistics for one calendar day of a forecast batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyForecastSummary {
    pub temperature_min: i32,
    pub temperature_max: i32,
    pub humidity_min: i32,
    pub humidity_max: i32,
    /// Distinct hourly descriptions in first-seen order.
    pub descriptions: Vec<String>,
}

impl DailyForecastSummary {
    /// Stored form of the description list.
    pub fn description(&self) -> String {
        self.descriptions.join(", ")
    }
}

/// Result of folding one fetched forecast: all days share `collected_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastBatch {
    pub collected_at: DateTime<Utc>,
    pub days: BTreeMap<NaiveDate, DailyForecastSummary>,
}

impl ForecastBatch {
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }
}
