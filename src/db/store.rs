//! Idempotent writes of current readings and daily forecast summaries.
//!
//! Every write is a single `INSERT ... ON CONFLICT DO UPDATE` statement, so each
//! row is atomic on its own and repeated writes for the same key converge to the
//! last payload. Nothing is read before writing.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::PgConnection;
use diesel::prelude::*;
use diesel::upsert::excluded;

use crate::db::models::{NewCurrentWeather, NewForecastDay};
use crate::models::weather::{CurrentReading, DailyForecastSummary};
use crate::schema;

#[derive(Debug)]
pub enum PersistError {
    Connect(String),
    Query(String),
}

impl core::fmt::Display for PersistError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PersistError::Connect(s) => write!(f, "database connection failed: {}", s),
            PersistError::Query(s) => write!(f, "database write failed: {}", s),
        }
    }
}

impl std::error::Error for PersistError {}

impl From<diesel::result::Error> for PersistError {
    fn from(value: diesel::result::Error) -> Self {
        PersistError::Query(value.to_string())
    }
}

impl From<diesel::result::ConnectionError> for PersistError {
    fn from(value: diesel::result::ConnectionError) -> Self {
        PersistError::Connect(value.to_string())
    }
}

/// Write side of the collector tables.
pub trait WeatherStore {
    fn upsert_current(&mut self, reading: &CurrentReading) -> Result<(), PersistError>;

    fn upsert_daily_summary(
        &mut self,
        collected_at: DateTime<Utc>,
        forecast_date: NaiveDate,
        summary: &DailyForecastSummary,
    ) -> Result<(), PersistError>;
}

/// Opens a store handle for the duration of one leg; dropping it closes the connection.
pub trait StoreConnector {
    type Store: WeatherStore;

    fn connect(&self) -> Result<Self::Store, PersistError>;
}

pub struct PgConnector {
    database_url: String,
}

impl PgConnector {
    pub fn new(database_url: impl Into<String>) -> Self {
        PgConnector {
            database_url: database_url.into(),
        }
    }
}

impl StoreConnector for PgConnector {
    type Store = PgConnection;

    fn connect(&self) -> Result<PgConnection, PersistError> {
        Ok(PgConnection::establish(&self.database_url)?)
    }
}

impl WeatherStore for PgConnection {
    fn upsert_current(&mut self, reading: &CurrentReading) -> Result<(), PersistError> {
        use schema::weather_current::dsl as C;

        let row = NewCurrentWeather::from(reading);
        diesel::insert_into(C::weather_current)
            .values(&row)
            .on_conflict(C::collection_time)
            .do_update()
            .set((
                C::temperature.eq(excluded(C::temperature)),
                C::temperature_min.eq(excluded(C::temperature_min)),
                C::temperature_max.eq(excluded(C::temperature_max)),
                C::humidity.eq(excluded(C::humidity)),
                C::description.eq(excluded(C::description)),
                C::feels_like.eq(excluded(C::feels_like)),
                C::wind_speed.eq(excluded(C::wind_speed)),
                C::wind_direction.eq(excluded(C::wind_direction)),
            ))
            .execute(self)?;
        Ok(())
    }

    fn upsert_daily_summary(
        &mut self,
        collected_at: DateTime<Utc>,
        forecast_date: NaiveDate,
        summary: &DailyForecastSummary,
    ) -> Result<(), PersistError> {
        use schema::weather_forecast::dsl as F;

        let row = NewForecastDay::new(collected_at, forecast_date, summary);
        diesel::insert_into(F::weather_forecast)
            .values(&row)
            .on_conflict((F::collection_time, F::forecast_date))
            .do_update()
            .set((
                F::temperature_min.eq(excluded(F::temperature_min)),
                F::temperature_max.eq(excluded(F::temperature_max)),
                F::humidity_min.eq(excluded(F::humidity_min)),
                F::humidity_max.eq(excluded(F::humidity_max)),
                F::description.eq(excluded(F::description)),
            ))
            .execute(self)?;
        Ok(())
    }
}
