pub mod models {
    pub mod openweather;
    pub mod weather;
}

pub mod client;
pub mod config;
pub mod env_file;
pub mod db {
    pub mod models;
    pub mod provision;
    pub mod store;
}
pub mod schema;
pub mod utils;
pub mod services {
    pub mod aggregate;
    pub mod cycle;
    pub mod scheduler;
}

use crate::client::OpenWeatherClient;
use crate::config::Config;
use crate::db::provision::ensure_schema_at;
use crate::db::store::PgConnector;
use crate::services::cycle::Collector;
use crate::services::scheduler::Scheduler;
use log::{error, info};

pub fn run() -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env().map_err(|e| e.to_string())?;
    info!(
        "Config loaded (lat={}, lon={}, units={}, interval={:.1}s, forecast_tz={}, base_url={}, create_schema={})",
        cfg.latitude,
        cfg.longitude,
        cfg.units,
        cfg.poll_interval.as_secs_f64(),
        cfg.forecast_timezone,
        cfg.base_url,
        cfg.create_schema
    );

    // 2) Wire the weather client and the store
    let client = OpenWeatherClient::new(cfg.base_url.clone(), cfg.api_key.clone(), cfg.http_timeout);
    let connector = PgConnector::new(cfg.database_url.clone());
    let collector = Collector::new(
        client,
        connector,
        cfg.latitude,
        cfg.longitude,
        cfg.units,
        cfg.forecast_timezone,
    );
    let mut scheduler = Scheduler::new(collector, cfg.poll_interval);

    // 3) Schema must be in place before the first cycle
    scheduler
        .start(|| ensure_schema_at(&cfg.database_url, cfg.create_schema))
        .map_err(|e| format!("Database schema not ready: {}", e))?;
    info!("Database schema ready");

    // 4) Poll until terminated
    scheduler.run_forever()
}

fn main() {
    let loaded_env = match env_file::load_from_args(std::env::args_os().skip(1)) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "weather-collector {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}

