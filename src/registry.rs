//! Latest reading per sensor, shared between the scan loop and consumers.

use crate::reading::SensorReading;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

#[derive(Debug, Default)]
struct Inner {
    devices: HashMap<String, SensorReading>,
    last_update: Option<SystemTime>,
}

/// Concurrent map from sensor address to its most recent reading.
///
/// Writers replace whole readings under an exclusive lock, so readers never
/// see a half-updated entry. Entries are never removed; use
/// [`SensorReading::age`] to judge staleness.
#[derive(Debug, Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // Every write is a single insert, so a panicking holder cannot leave the
    // map inconsistent and poisoning can be ignored.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a reading, replacing any previous one for the same address.
    pub fn upsert(&self, reading: SensorReading) {
        let mut inner = self.write();
        let observed_at = reading.observed_at();
        inner.devices.insert(reading.address().to_string(), reading);
        inner.last_update = Some(inner.last_update.map_or(observed_at, |t| t.max(observed_at)));
    }

    pub fn get(&self, address: &str) -> Option<SensorReading> {
        self.read().devices.get(address).cloned()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.read().devices.contains_key(address)
    }

    /// Point-in-time copy of all readings, in no particular order.
    pub fn list(&self) -> Vec<SensorReading> {
        self.read().devices.values().cloned().collect()
    }

    /// When the most recent reading was observed, `None` before the first one.
    pub fn last_update(&self) -> Option<SystemTime> {
        self.read().last_update
    }

    pub fn len(&self) -> usize {
        self.read().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().devices.is_empty()
    }
}
