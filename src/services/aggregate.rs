//! Folds hourly forecast samples into one summary per calendar day.

use crate::models::weather::{DailyForecastSummary, ForecastBatch, ForecastSample};
use crate::utils::round_half_even;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Calendar day of `sample_time` as seen on a wall clock in `tz`.
pub fn forecast_date(sample_time: DateTime<Utc>, tz: Tz) -> NaiveDate {
    sample_time.with_timezone(&tz).date_naive()
}

/// Group `samples` by calendar day in `tz` and fold each group left to right.
///
/// Temperature bounds are compared after rounding, so every stored bound is
/// the rounded value of some sample. Humidity is taken as-is. Descriptions are
/// kept once each, in the order they first appear. An empty input gives an
/// empty batch.
pub fn aggregate(samples: &[ForecastSample], collected_at: DateTime<Utc>, tz: Tz) -> ForecastBatch {
    let mut days: BTreeMap<NaiveDate, DailyForecastSummary> = BTreeMap::new();

    for sample in samples {
        let temp_min = round_half_even(sample.temp_min);
        let temp_max = round_half_even(sample.temp_max);

        match days.entry(forecast_date(sample.sample_time, tz)) {
            Entry::Vacant(slot) => {
                slot.insert(DailyForecastSummary {
                    temperature_min: temp_min,
                    temperature_max: temp_max,
                    humidity_min: sample.humidity,
                    humidity_max: sample.humidity,
                    descriptions: vec![sample.description.clone()],
                });
            }
            Entry::Occupied(mut slot) => {
                let day = slot.get_mut();
                day.temperature_min = day.temperature_min.min(temp_min);
                day.temperature_max = day.temperature_max.max(temp_max);
                day.humidity_min = day.humidity_min.min(sample.humidity);
                day.humidity_max = day.humidity_max.max(sample.humidity);
                if !day.descriptions.iter().any(|d| d == &sample.description) {
                    day.descriptions.push(sample.description.clone());
                }
            }
        }
    }

    ForecastBatch { collected_at, days }
}
