//! Startup check that both collector tables exist, creating them when allowed.

use diesel::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{Bool, Text};
use log::info;

pub const CURRENT_TABLE: &str = "weather_current";
pub const FORECAST_TABLE: &str = "weather_forecast";

const CREATE_CURRENT: &str = "
    CREATE TABLE weather_current (
        collection_time TIMESTAMPTZ PRIMARY KEY,
        temperature INTEGER,
        temperature_min INTEGER,
        temperature_max INTEGER,
        humidity INTEGER,
        description VARCHAR(200),
        feels_like INTEGER,
        wind_speed DECIMAL,
        wind_direction INTEGER
    )";

const CREATE_FORECAST: &str = "
    CREATE TABLE weather_forecast (
        collection_time TIMESTAMPTZ,
        forecast_date DATE,
        temperature_min INTEGER,
        temperature_max INTEGER,
        humidity_min INTEGER,
        humidity_max INTEGER,
        description VARCHAR(200),
        PRIMARY KEY (collection_time, forecast_date)
    )";

#[derive(Debug)]
pub enum SchemaError {
    Connect(String),
    Query { table: &'static str, message: String },
    Missing(&'static str),
}

impl core::fmt::Display for SchemaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SchemaError::Connect(s) => write!(f, "schema check could not connect: {}", s),
            SchemaError::Query { table, message } => write!(f, "schema setup for {} failed: {}", table, message),
            SchemaError::Missing(table) => {
                write!(f, "table {} does not exist and schema creation is disabled", table)
            }
        }
    }
}

impl std::error::Error for SchemaError {}

#[derive(QueryableByName)]
struct TablePresence {
    #[diesel(sql_type = Bool)]
    present: bool,
}

fn table_exists(conn: &mut PgConnection, table: &'static str) -> Result<bool, SchemaError> {
    diesel::sql_query(
        "SELECT EXISTS (SELECT FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = $1) AS present",
    )
    .bind::<Text, _>(table)
    .get_result::<TablePresence>(conn)
    .map(|row| row.present)
    .map_err(|e| SchemaError::Query {
        table,
        message: e.to_string(),
    })
}

/// Make sure `weather_current` and `weather_forecast` exist.
///
/// Missing tables are created when `create_missing` is set; otherwise their
/// absence is an error. Existing tables are never altered.
pub fn ensure_schema(conn: &mut PgConnection, create_missing: bool) -> Result<(), SchemaError> {
    for (table, ddl) in [(CURRENT_TABLE, CREATE_CURRENT), (FORECAST_TABLE, CREATE_FORECAST)] {
        if table_exists(conn, table)? {
            info!("Table {} present", table);
            continue;
        }
        if !create_missing {
            return Err(SchemaError::Missing(table));
        }
        info!("Creating {} table", table);
        diesel::sql_query(ddl)
            .execute(conn)
            .map_err(|e| SchemaError::Query {
                table,
                message: e.to_string(),
            })?;
    }
    Ok(())
}

/// Connect, check the schema and drop the connection again.
pub fn ensure_schema_at(database_url: &str, create_missing: bool) -> Result<(), SchemaError> {
    let mut conn = PgConnection::establish(database_url).map_err(|e| SchemaError::Connect(e.to_string()))?;
    ensure_schema(&mut conn, create_missing)
}
