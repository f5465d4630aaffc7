//! Diesel table declarations for the two collector tables.
//!
//! `db::provision` owns the DDL; these declarations must stay in step with it.

diesel::table! {
    weather_current (collection_time) {
        collection_time -> Timestamptz,
        temperature -> Integer,
        temperature_min -> Integer,
        temperature_max -> Integer,
        humidity -> Integer,
        #[max_length = 200]
        description -> Varchar,
        feels_like -> Integer,
        wind_speed -> Numeric,
        wind_direction -> Integer,
    }
}

diesel::table! {
    weather_forecast (collection_time, forecast_date) {
        collection_time -> Timestamptz,
        forecast_date -> Date,
        temperature_min -> Integer,
        temperature_max -> Integer,
        humidity_min -> Integer,
        humidity_max -> Integer,
        #[max_length = 200]
        description -> Varchar,
    }
}

diesel::allow_tables_to_appear_in_same_query!(weather_current, weather_forecast);
