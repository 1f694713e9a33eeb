//! Output formatters for Mopeka readings.
//!
//! This module provides a trait for formatting readings and implementations
//! for various output formats. Currently supports InfluxDB line protocol.

pub mod influxdb;

use crate::reading::SensorReading;

/// Trait for formatting sensor readings into output strings.
pub trait OutputFormatter: Send + Sync {
    /// Format a reading as a single line (without trailing newline).
    fn format(&self, reading: &SensorReading) -> String;
}
