//! One collection cycle: current conditions and forecast, each fetched and stored on its own.
//!
//! The two legs never affect each other. A leg whose fetch fails writes nothing;
//! a leg whose writes fail keeps going row by row and reports what it managed.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use core::fmt;
use log::{error, info, warn};

use crate::client::{FetchError, WeatherSource};
use crate::db::store::{PersistError, StoreConnector, WeatherStore};
use crate::models::weather::{CurrentReading, ForecastBatch, Units};
use crate::services::aggregate::aggregate;
use crate::utils::now_micros;

#[derive(Debug)]
pub enum LegOutcome {
    Persisted { rows: usize },
    FetchFailed(FetchError),
    PersistFailed { persisted: usize, failed: usize, error: PersistError },
}

impl LegOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LegOutcome::Persisted { .. })
    }

    pub fn rows_written(&self) -> usize {
        match self {
            LegOutcome::Persisted { rows } => *rows,
            LegOutcome::FetchFailed(_) => 0,
            LegOutcome::PersistFailed { persisted, .. } => *persisted,
        }
    }
}

impl fmt::Display for LegOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegOutcome::Persisted { rows } => write!(f, "ok ({} row(s))", rows),
            LegOutcome::FetchFailed(e) => write!(f, "fetch failed: {}", e),
            LegOutcome::PersistFailed {
                persisted,
                failed,
                error,
            } => write!(
                f,
                "persist failed ({} written, {} failed, last error: {})",
                persisted, failed, error
            ),
        }
    }
}

#[derive(Debug)]
pub struct CycleReport {
    pub current: LegOutcome,
    pub forecast: LegOutcome,
}

impl CycleReport {
    pub fn rows_written(&self) -> usize {
        self.current.rows_written() + self.forecast.rows_written()
    }
}

pub struct Collector<S, C> {
    source: S,
    connector: C,
    latitude: f64,
    longitude: f64,
    units: Units,
    forecast_timezone: Tz,
    clock: fn() -> DateTime<Utc>,
}

impl<S: WeatherSource, C: StoreConnector> Collector<S, C> {
    pub fn new(source: S, connector: C, latitude: f64, longitude: f64, units: Units, forecast_timezone: Tz) -> Self {
        Collector {
            source,
            connector,
            latitude,
            longitude,
            units,
            forecast_timezone,
            clock: now_micros,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Run both legs once. Never fails; problems are logged and reported per leg.
    pub fn run_cycle(&self) -> CycleReport {
        let current = self.collect_current();
        match &current {
            LegOutcome::Persisted { .. } => {}
            LegOutcome::FetchFailed(e) => error!("Current weather fetch failed: {}", e),
            LegOutcome::PersistFailed { error: e, .. } => error!("Current weather not stored: {}", e),
        }

        let forecast = self.collect_forecast();
        match &forecast {
            LegOutcome::Persisted { rows } => info!("Stored {} forecast day(s)", rows),
            LegOutcome::FetchFailed(e) => error!("Forecast fetch failed: {}", e),
            LegOutcome::PersistFailed {
                persisted, failed, ..
            } => error!(
                "Forecast partially stored: {} day(s) written, {} failed",
                persisted, failed
            ),
        }

        CycleReport { current, forecast }
    }

    fn collect_current(&self) -> LegOutcome {
        let conditions = match self.source.fetch_current(self.latitude, self.longitude, self.units) {
            Ok(c) => c,
            Err(e) => return LegOutcome::FetchFailed(e),
        };
        let reading = conditions.collected_at((self.clock)());
        log_current(&reading);

        let mut store = match self.connector.connect() {
            Ok(s) => s,
            Err(error) => {
                return LegOutcome::PersistFailed {
                    persisted: 0,
                    failed: 1,
                    error,
                };
            }
        };
        match store.upsert_current(&reading) {
            Ok(()) => {
                info!("Stored current weather for {}", reading.collected_at);
                LegOutcome::Persisted { rows: 1 }
            }
            Err(error) => LegOutcome::PersistFailed {
                persisted: 0,
                failed: 1,
                error,
            },
        }
    }

    fn collect_forecast(&self) -> LegOutcome {
        let samples = match self.source.fetch_forecast(self.latitude, self.longitude, self.units) {
            Ok(s) => s,
            Err(e) => return LegOutcome::FetchFailed(e),
        };
        let batch = aggregate(&samples, (self.clock)(), self.forecast_timezone);
        if batch.is_empty() {
            info!("Forecast returned no samples; nothing to store");
            return LegOutcome::Persisted { rows: 0 };
        }
        log_forecast(&batch);

        let mut store = match self.connector.connect() {
            Ok(s) => s,
            Err(error) => {
                return LegOutcome::PersistFailed {
                    persisted: 0,
                    failed: batch.len(),
                    error,
                };
            }
        };
        persist_batch(&mut store, &batch)
    }
}

/// Write every day of `batch`, continuing past failures. Earlier rows stay committed.
pub fn persist_batch<W: WeatherStore>(store: &mut W, batch: &ForecastBatch) -> LegOutcome {
    let mut persisted = 0;
    let mut failures = 0;
    let mut last_error = None;

    for (date, summary) in &batch.days {
        match store.upsert_daily_summary(batch.collected_at, *date, summary) {
            Ok(()) => persisted += 1,
            Err(e) => {
                warn!("Forecast for {} not stored: {}", date, e);
                failures += 1;
                last_error = Some(e);
            }
        }
    }

    match last_error {
        None => LegOutcome::Persisted { rows: persisted },
        Some(error) => LegOutcome::PersistFailed {
            persisted,
            failed: failures,
            error,
        },
    }
}

fn log_current(reading: &CurrentReading) {
    let c = &reading.conditions;
    info!(
        "Current: temp={} min={} max={} humidity={} description=\"{}\"",
        c.temperature, c.temperature_min, c.temperature_max, c.humidity, c.description
    );
    info!(
        "Current: feels_like={} wind_speed={} wind_direction={}",
        c.feels_like, c.wind_speed, c.wind_direction
    );
}

fn log_forecast(batch: &ForecastBatch) {
    for (date, day) in &batch.days {
        info!(
            "Forecast {}: temp {}..{} humidity {}..{} \"{}\"",
            date,
            day.temperature_min,
            day.temperature_max,
            day.humidity_min,
            day.humidity_max,
            day.description()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::weather::{CurrentConditions, DailyForecastSummary, ForecastSample};
    use bigdecimal::BigDecimal;
    use chrono::{NaiveDate, TimeZone};
    use std::cell::{Cell, RefCell};
    use std::collections::BTreeMap;
    use std::rc::Rc;

    #[derive(Default)]
    struct Writes {
        current: Vec<CurrentReading>,
        forecast: BTreeMap<(DateTime<Utc>, NaiveDate), DailyForecastSummary>,
        forecast_calls: usize,
    }

    struct FakeStore {
        writes: Rc<RefCell<Writes>>,
        fail_dates: Vec<NaiveDate>,
        fail_current: bool,
    }

    impl WeatherStore for FakeStore {
        fn upsert_current(&mut self, reading: &CurrentReading) -> Result<(), PersistError> {
            if self.fail_current {
                return Err(PersistError::Query("disk full".into()));
            }
            let mut w = self.writes.borrow_mut();
            w.current.retain(|r| r.collected_at != reading.collected_at);
            w.current.push(reading.clone());
            Ok(())
        }

        fn upsert_daily_summary(
            &mut self,
            collected_at: DateTime<Utc>,
            forecast_date: NaiveDate,
            summary: &DailyForecastSummary,
        ) -> Result<(), PersistError> {
            let mut w = self.writes.borrow_mut();
            w.forecast_calls += 1;
            if self.fail_dates.contains(&forecast_date) {
                return Err(PersistError::Query(format!("rejected {forecast_date}")));
            }
            w.forecast.insert((collected_at, forecast_date), summary.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeConnector {
        writes: Rc<RefCell<Writes>>,
        refuse: bool,
        fail_dates: Vec<NaiveDate>,
        fail_current: bool,
        connects: Cell<usize>,
    }

    impl StoreConnector for FakeConnector {
        type Store = FakeStore;

        fn connect(&self) -> Result<FakeStore, PersistError> {
            self.connects.set(self.connects.get() + 1);
            if self.refuse {
                return Err(PersistError::Connect("connection refused".into()));
            }
            Ok(FakeStore {
                writes: Rc::clone(&self.writes),
                fail_dates: self.fail_dates.clone(),
                fail_current: self.fail_current,
            })
        }
    }

    struct FakeSource {
        current: Result<CurrentConditions, u16>,
        forecast: Result<Vec<ForecastSample>, u16>,
    }

    impl WeatherSource for FakeSource {
        fn fetch_current(&self, _lat: f64, _lon: f64, _units: Units) -> Result<CurrentConditions, FetchError> {
            self.current.clone().map_err(|status| FetchError::Http {
                status,
                message: "boom".into(),
            })
        }

        fn fetch_forecast(&self, _lat: f64, _lon: f64, _units: Units) -> Result<Vec<ForecastSample>, FetchError> {
            self.forecast.clone().map_err(|status| FetchError::Http {
                status,
                message: "boom".into(),
            })
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap()
    }

    fn conditions() -> CurrentConditions {
        CurrentConditions {
            temperature: 72,
            temperature_min: 68,
            temperature_max: 76,
            humidity: 48,
            description: "scattered clouds".into(),
            feels_like: 72,
            wind_speed: BigDecimal::from(8),
            wind_direction: 250,
        }
    }

    fn samples() -> Vec<ForecastSample> {
        let at = |h: u32| Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::hours(h as i64);
        vec![
            ForecastSample {
                sample_time: at(0),
                temp_min: 30.1,
                temp_max: 35.8,
                humidity: 40,
                description: "clear".into(),
            },
            ForecastSample {
                sample_time: at(27),
                temp_min: 25.5,
                temp_max: 27.5,
                humidity: 70,
                description: "cloudy".into(),
            },
            ForecastSample {
                sample_time: at(51),
                temp_min: 20.0,
                temp_max: 22.0,
                humidity: 90,
                description: "rain".into(),
            },
        ]
    }

    fn collector(source: FakeSource, connector: FakeConnector) -> Collector<FakeSource, FakeConnector> {
        Collector::new(source, connector, 37.77, -122.42, Units::Imperial, Tz::UTC).with_clock(fixed_now)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn happy_path_stores_both_legs() {
        let connector = FakeConnector::default();
        let writes = Rc::clone(&connector.writes);
        let c = collector(
            FakeSource {
                current: Ok(conditions()),
                forecast: Ok(samples()),
            },
            connector,
        );

        let report = c.run_cycle();
        assert!(report.current.is_success());
        assert!(report.forecast.is_success());
        assert_eq!(report.rows_written(), 4);

        let w = writes.borrow();
        assert_eq!(w.current.len(), 1);
        assert_eq!(w.current[0].collected_at, fixed_now());
        assert_eq!(w.forecast.len(), 3);
        assert!(w.forecast.keys().all(|(collected, _)| *collected == fixed_now()));
        assert_eq!(w.forecast[&(fixed_now(), day(2))].temperature_min, 26);
    }

    #[test]
    fn current_fetch_failure_does_not_block_forecast() {
        let connector = FakeConnector::default();
        let writes = Rc::clone(&connector.writes);
        let c = collector(
            FakeSource {
                current: Err(503),
                forecast: Ok(samples()),
            },
            connector,
        );

        let report = c.run_cycle();
        assert!(matches!(report.current, LegOutcome::FetchFailed(FetchError::Http { status: 503, .. })));
        assert!(matches!(report.forecast, LegOutcome::Persisted { rows: 3 }));
        assert!(writes.borrow().current.is_empty());
    }

    #[test]
    fn forecast_fetch_failure_does_not_block_current() {
        let connector = FakeConnector::default();
        let writes = Rc::clone(&connector.writes);
        let c = collector(
            FakeSource {
                current: Ok(conditions()),
                forecast: Err(401),
            },
            connector,
        );

        let report = c.run_cycle();
        assert!(matches!(report.current, LegOutcome::Persisted { rows: 1 }));
        assert!(matches!(report.forecast, LegOutcome::FetchFailed(_)));
        assert_eq!(writes.borrow().forecast_calls, 0);
        // only the current leg needed a connection
        assert_eq!(c.connector.connects.get(), 1);
    }

    #[test]
    fn empty_forecast_is_success_without_writes() {
        let connector = FakeConnector::default();
        let writes = Rc::clone(&connector.writes);
        let c = collector(
            FakeSource {
                current: Err(500),
                forecast: Ok(Vec::new()),
            },
            connector,
        );

        let report = c.run_cycle();
        assert!(matches!(report.forecast, LegOutcome::Persisted { rows: 0 }));
        assert_eq!(writes.borrow().forecast_calls, 0);
        assert_eq!(c.connector.connects.get(), 0);
    }

    #[test]
    fn mid_batch_failure_still_attempts_remaining_days() {
        let connector = FakeConnector {
            fail_dates: vec![day(2)],
            ..Default::default()
        };
        let writes = Rc::clone(&connector.writes);
        let c = collector(
            FakeSource {
                current: Ok(conditions()),
                forecast: Ok(samples()),
            },
            connector,
        );

        let report = c.run_cycle();
        match &report.forecast {
            LegOutcome::PersistFailed { persisted, failed, .. } => {
                assert_eq!(*persisted, 2);
                assert_eq!(*failed, 1);
            }
            other => panic!("unexpected outcome: {other}"),
        }
        let w = writes.borrow();
        assert_eq!(w.forecast_calls, 3);
        assert!(w.forecast.contains_key(&(fixed_now(), day(1))));
        assert!(!w.forecast.contains_key(&(fixed_now(), day(2))));
        assert!(w.forecast.contains_key(&(fixed_now(), day(3))));
        assert!(report.current.is_success());
    }

    #[test]
    fn connect_failure_is_reported_per_leg() {
        let connector = FakeConnector {
            refuse: true,
            ..Default::default()
        };
        let c = collector(
            FakeSource {
                current: Ok(conditions()),
                forecast: Ok(samples()),
            },
            connector,
        );

        let report = c.run_cycle();
        assert!(matches!(
            report.current,
            LegOutcome::PersistFailed {
                persisted: 0,
                failed: 1,
                error: PersistError::Connect(_)
            }
        ));
        assert!(matches!(
            report.forecast,
            LegOutcome::PersistFailed {
                persisted: 0,
                failed: 3,
                ..
            }
        ));
        assert_eq!(report.rows_written(), 0);
    }

    #[test]
    fn current_write_failure_does_not_block_forecast() {
        let connector = FakeConnector {
            fail_current: true,
            ..Default::default()
        };
        let c = collector(
            FakeSource {
                current: Ok(conditions()),
                forecast: Ok(samples()),
            },
            connector,
        );

        let report = c.run_cycle();
        assert!(matches!(report.current, LegOutcome::PersistFailed { .. }));
        assert!(matches!(report.forecast, LegOutcome::Persisted { rows: 3 }));
    }

    #[test]
    fn repeated_cycle_with_same_clock_converges() {
        let connector = FakeConnector::default();
        let writes = Rc::clone(&connector.writes);
        let c = collector(
            FakeSource {
                current: Ok(conditions()),
                forecast: Ok(samples()),
            },
            connector,
        );

        c.run_cycle();
        c.run_cycle();
        let w = writes.borrow();
        assert_eq!(w.current.len(), 1);
        assert_eq!(w.forecast.len(), 3);
        assert_eq!(w.forecast_calls, 6);
    }
}
