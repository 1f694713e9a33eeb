//! Background BLE scanning for Mopeka sensors.
//!
//! The [`ScanController`] repeatedly asks a [`Radio`] for bounded scan
//! windows, feeds every admitted advertisement through the decoder and keeps
//! the latest reading per sensor in a shared [`Registry`].

#[cfg(feature = "bluer")]
pub mod bluer;

use crate::mopeka::{self, MOPEKA_MANUFACTURER_ID};
use crate::reading::SensorReading;
use crate::registry::Registry;
use log::{debug, info, trace, warn};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Error type for radio operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth/adapter related error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
    /// No usable adapter could be set up
    #[error("Adapter unavailable: {0}")]
    AdapterUnavailable(String),
}

/// One received BLE advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Hardware address, e.g. `AA:BB:CC:DD:EE:FF`
    pub address: String,
    /// Advertised local name, empty if none
    pub name: String,
    /// Signal strength in dBm
    pub rssi: i16,
    /// Manufacturer-specific data, starting with the little-endian manufacturer ID
    pub manufacturer_data: Vec<u8>,
}

/// Callback invoked once per advertisement during a scan window.
pub type AdvertisementHandler<'a> = dyn FnMut(Advertisement) + Send + 'a;

/// Radio abstraction to enable deterministic unit tests without Bluetooth hardware.
pub trait Radio: Send + Sync {
    /// Listen for `window` and pass every received advertisement to `on_advertisement`.
    ///
    /// Returns once the window has elapsed.
    fn scan_window<'a>(
        &'a self,
        window: Duration,
        on_advertisement: &'a mut AdvertisementHandler<'_>,
    ) -> Pin<Box<dyn Future<Output = Result<(), ScanError>> + Send + 'a>>;
}

/// Lifecycle of the background scan loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Idle,
    Running,
    /// Stop requested; the loop exits after its current window.
    Stopping,
}

/// Admit, decode and store one advertisement.
///
/// Readings are stamped no earlier than the registry's last update so that
/// `observed_at` never goes backwards, even if the wall clock does.
///
/// Returns `true` if the advertisement was a Mopeka payload.
pub fn ingest(registry: &Registry, advertisement: &Advertisement) -> bool {
    if !mopeka::admit(MOPEKA_MANUFACTURER_ID, &advertisement.manufacturer_data) {
        trace!(
            "Ignoring {} bytes of manufacturer data from {}",
            advertisement.manufacturer_data.len(),
            advertisement.address
        );
        return false;
    }

    let now = SystemTime::now();
    let observed_at = registry.last_update().map_or(now, |last| now.max(last));

    let Some(reading) = mopeka::decode(
        &advertisement.address,
        observed_at,
        &advertisement.name,
        advertisement.rssi,
        &advertisement.manufacturer_data,
    ) else {
        return false;
    };

    if !registry.contains(reading.address()) {
        debug!(
            "Discovered {} sensor {} ({})",
            reading.sensor_type_label(),
            reading.address(),
            reading.name()
        );
    }
    registry.upsert(reading);
    true
}

/// Owns the background scan loop and the registry it fills.
pub struct ScanController {
    radio: Arc<dyn Radio>,
    registry: Arc<Registry>,
    window: Duration,
    state: Arc<watch::Sender<ScanState>>,
}

impl ScanController {
    /// Create an idle controller.
    ///
    /// # Arguments
    /// * `radio` - Source of advertisements
    /// * `window` - Duration of each scan window, also the upper bound on stop latency
    pub fn new(radio: Arc<dyn Radio>, window: Duration) -> Self {
        Self::with_registry(radio, window, Arc::new(Registry::new()))
    }

    /// Create an idle controller that writes into an existing registry.
    pub fn with_registry(radio: Arc<dyn Radio>, window: Duration, registry: Arc<Registry>) -> Self {
        let (state, _) = watch::channel(ScanState::Idle);
        Self {
            radio,
            registry,
            window,
            state: Arc::new(state),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn state(&self) -> ScanState {
        *self.state.borrow()
    }

    /// Start the scan loop on the current Tokio runtime.
    ///
    /// Calling this while the loop is running does nothing. Calling it while a
    /// stop is pending cancels the stop and the existing loop keeps going, so
    /// there is never more than one loop per controller.
    ///
    /// # Panics
    /// Panics when called outside of a Tokio runtime.
    pub fn start_scan(&self) {
        let mut spawn = false;
        self.state.send_if_modified(|state| match *state {
            ScanState::Idle => {
                *state = ScanState::Running;
                spawn = true;
                true
            }
            ScanState::Stopping => {
                *state = ScanState::Running;
                true
            }
            ScanState::Running => false,
        });

        if spawn {
            tokio::spawn(scan_loop(
                Arc::clone(&self.radio),
                Arc::clone(&self.registry),
                Arc::clone(&self.state),
                self.window,
            ));
        }
    }

    /// Ask the scan loop to stop after its current window.
    pub fn stop_scan(&self) {
        self.state.send_if_modified(|state| {
            if *state == ScanState::Running {
                *state = ScanState::Stopping;
                true
            } else {
                false
            }
        });
    }

    /// Wait until the scan loop has acknowledged a stop (or was never started).
    pub async fn wait_until_idle(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|state| *state == ScanState::Idle).await;
    }

    /// Current snapshot of every known sensor, in no particular order.
    pub fn devices(&self) -> Vec<SensorReading> {
        self.registry.list()
    }

    pub fn device(&self, address: &str) -> Option<SensorReading> {
        self.registry.get(address)
    }

    /// Time of the most recent successful decode across all sensors.
    pub fn last_update_time(&self) -> Option<SystemTime> {
        self.registry.last_update()
    }
}

impl Drop for ScanController {
    fn drop(&mut self) {
        self.stop_scan();
    }
}

/// Take the loop back to idle if a stop was requested. Returns `true` if it did.
fn acknowledge_stop(state: &watch::Sender<ScanState>) -> bool {
    state.send_if_modified(|state| {
        if *state == ScanState::Stopping {
            *state = ScanState::Idle;
            true
        } else {
            false
        }
    })
}

async fn scan_loop(
    radio: Arc<dyn Radio>,
    registry: Arc<Registry>,
    state: Arc<watch::Sender<ScanState>>,
    window: Duration,
) {
    info!("Started scanning every {:?}", window);

    while !acknowledge_stop(&state) {
        let started = Instant::now();
        let mut on_advertisement = |advertisement: Advertisement| {
            ingest(&registry, &advertisement);
        };

        if let Err(e) = radio.scan_window(window, &mut on_advertisement).await {
            warn!("Scan window failed: {e}");
            // Keep the window cadence so a broken adapter doesn't spin the loop.
            tokio::time::sleep_until(started + window).await;
        }
    }

    info!("Stopped scanning.");
}
