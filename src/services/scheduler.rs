//! Fixed-cadence driver for the collection cycle.

use log::{error, info, warn};
use std::thread;
use std::time::{Duration, Instant};

use crate::client::WeatherSource;
use crate::db::provision::SchemaError;
use crate::db::store::StoreConnector;
use crate::services::cycle::{Collector, CycleReport};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Halted,
}

#[derive(Debug)]
pub enum StartError {
    /// An earlier start failed; a halted scheduler stays halted.
    Halted,
    Schema(SchemaError),
}

impl core::fmt::Display for StartError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StartError::Halted => write!(f, "scheduler is halted"),
            StartError::Schema(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StartError {}

impl From<SchemaError> for StartError {
    fn from(value: SchemaError) -> Self {
        StartError::Schema(value)
    }
}

/// Time left in the interval after a cycle that took `elapsed`; zero on overrun.
pub fn remaining_sleep(interval: Duration, elapsed: Duration) -> Duration {
    interval.saturating_sub(elapsed)
}

pub struct Scheduler<S, C> {
    collector: Collector<S, C>,
    interval: Duration,
    state: SchedulerState,
    cycles: u64,
}

impl<S: WeatherSource, C: StoreConnector> Scheduler<S, C> {
    pub fn new(collector: Collector<S, C>, interval: Duration) -> Self {
        Scheduler {
            collector,
            interval,
            state: SchedulerState::Idle,
            cycles: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Leave `Idle`: `Running` when the schema is in place, `Halted` otherwise.
    /// Starting a running scheduler is a no-op; starting a halted one fails.
    pub fn start<F>(&mut self, ensure_schema: F) -> Result<(), StartError>
    where
        F: FnOnce() -> Result<(), SchemaError>,
    {
        match self.state {
            SchedulerState::Running => return Ok(()),
            SchedulerState::Halted => return Err(StartError::Halted),
            SchedulerState::Idle => {}
        }
        match ensure_schema() {
            Ok(()) => {
                self.state = SchedulerState::Running;
                Ok(())
            }
            Err(e) => {
                self.state = SchedulerState::Halted;
                Err(e.into())
            }
        }
    }

    /// Run one cycle and return how long to wait before the next one.
    /// Does nothing unless the scheduler is `Running`.
    pub fn tick(&mut self) -> Option<(CycleReport, Duration)> {
        if self.state != SchedulerState::Running {
            return None;
        }

        let started = Instant::now();
        self.cycles += 1;
        info!("Cycle {} starting at {}", self.cycles, chrono::Utc::now());
        let report = self.collector.run_cycle();
        let elapsed = started.elapsed();

        info!(
            "Cycle {} done in {:.1}s: current {}, forecast {}",
            self.cycles,
            elapsed.as_secs_f64(),
            report.current,
            report.forecast
        );

        let sleep = remaining_sleep(self.interval, elapsed);
        if sleep.is_zero() {
            warn!(
                "Cycle {} took {:.1}s, longer than the {:.1}s interval; starting next cycle now",
                self.cycles,
                elapsed.as_secs_f64(),
                self.interval.as_secs_f64()
            );
        }
        Some((report, sleep))
    }

    /// Loop until the process is terminated. Returns only if the scheduler never started.
    pub fn run_forever(&mut self) -> Result<(), String> {
        if self.state != SchedulerState::Running {
            error!("Scheduler is {:?}; not entering the polling loop", self.state);
            return Err(format!("scheduler not running (state {:?})", self.state));
        }
        info!("Polling every {:.1}s", self.interval.as_secs_f64());
        while let Some((_, sleep)) = self.tick() {
            if !sleep.is_zero() {
                thread::sleep(sleep);
            }
        }
        Err(format!("scheduler left the polling loop (state {:?})", self.state))
    }
}
