//! Core application runner (business logic) for `mopeka-listener`.
//!
//! This module is intentionally decoupled from CLI parsing and process exit codes
//! so it can be tested deterministically.

use crate::config::{
    DEFAULT_REPORT_INTERVAL, DEFAULT_SCAN_INTERVAL, parse_duration, parse_nonzero_duration,
};
use crate::output::OutputFormatter;
use crate::output::influxdb::InfluxDbFormatter;
use crate::reading::SensorReading;
use crate::registry::Registry;
use crate::scanner::{Radio, ScanController, ScanError};
use crate::tank::TankProfile;
use clap::Parser;
use log::{debug, info};
use std::future::Future;
use std::io;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "mopeka_measurement")]
    pub influxdb_measurement: String,

    /// Length of one BLE scan window. Stopping takes at most this long.
    /// Accepts duration with suffix: 3s, 1m, 500ms, 2h.
    #[arg(long, default_value = DEFAULT_SCAN_INTERVAL, value_parser = parse_nonzero_duration)]
    pub scan_interval: Duration,

    /// How often the latest reading of every sensor is printed.
    #[arg(long, default_value = DEFAULT_REPORT_INTERVAL, value_parser = parse_nonzero_duration)]
    pub report_interval: Duration,

    /// Leave out sensors that have not been heard from for this long.
    #[arg(long, value_parser = parse_duration)]
    pub stale_after: Option<Duration>,

    /// Tank profile used to compute the fill percentage.
    #[arg(long, default_value_t, value_enum)]
    pub tank: TankProfile,

    /// Verbose output, log every discovered sensor and failed scan window
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Write the current readings, sorted by address, one line each.
fn write_snapshot(
    formatter: &dyn OutputFormatter,
    registry: &Registry,
    stale_after: Option<Duration>,
    out: &mut dyn Write,
) -> io::Result<()> {
    let mut readings: Vec<SensorReading> = registry
        .list()
        .into_iter()
        .filter(|r| stale_after.is_none_or(|max_age| r.age() <= max_age))
        .collect();
    readings.sort_by(|a, b| a.address().cmp(b.address()));

    for reading in &readings {
        writeln!(out, "{}", formatter.format(reading))?;
    }
    out.flush()
}

/// Run the scanner until `shutdown` completes, writing a snapshot of all known
/// sensors to `out` every report interval and once more on shutdown.
pub async fn run_with_io(
    options: Options,
    radio: Arc<dyn Radio>,
    out: &mut dyn Write,
    shutdown: impl Future<Output = ()>,
) -> Result<(), RunError> {
    let formatter = InfluxDbFormatter::new(options.influxdb_measurement, options.tank);
    let controller = ScanController::new(radio, options.scan_interval);

    controller.start_scan();

    let mut ticker = tokio::time::interval(options.report_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; there is nothing to report yet.
    ticker.tick().await;

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                debug!("Reporting {} sensors", controller.registry().len());
                write_snapshot(&formatter, controller.registry(), options.stale_after, out)?;
            }
        }
    }

    info!("Shutting down");
    controller.stop_scan();
    controller.wait_until_idle().await;

    write_snapshot(&formatter, controller.registry(), options.stale_after, out)?;
    Ok(())
}
