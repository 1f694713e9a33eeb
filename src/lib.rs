//! `mopeka-listener` library.
//!
//! Decodes Mopeka Pro Check tank sensor advertisements and keeps the latest
//! reading of every sensor in a concurrent [`Registry`]. The binary
//! (`src/main.rs`) only handles CLI parsing, logging setup and exit codes; the
//! run loop lives in [`crate::app`] where it can be tested with a fake radio.

pub mod app;
pub mod config;
pub mod geometry;
pub mod mopeka;
pub mod output;
pub mod reading;
pub mod registry;
pub mod scanner;
pub mod tank;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export commonly used types at the crate root
pub use mopeka::{MOPEKA_MANUFACTURER_ID, SensorType, admit, decode};
pub use output::OutputFormatter;
pub use output::influxdb::InfluxDbFormatter;
pub use reading::SensorReading;
pub use registry::Registry;
pub use scanner::{Advertisement, Radio, ScanController, ScanError, ScanState, ingest};
pub use tank::TankProfile;
