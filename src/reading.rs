//! Decoded Mopeka sensor reading.

use crate::mopeka::{PAYLOAD_LEN, PROPANE_LEVEL_COEFFICIENTS, SensorType};
use crate::tank::TankProfile;
use std::time::{Duration, SystemTime};

const MM_PER_INCH: f64 = 25.4;
const BATTERY_EMPTY_VOLTS: f64 = 2.2;
const BATTERY_RANGE_VOLTS: f64 = 0.65;

/// The latest advertisement received from one sensor.
///
/// Only the raw payload is stored. Every engineering value is derived from it
/// on demand, so two readings with equal payloads always agree.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    address: String,
    observed_at: SystemTime,
    name: String,
    rssi: i16,
    payload: [u8; PAYLOAD_LEN],
}

impl SensorReading {
    pub(crate) fn new(
        address: String,
        observed_at: SystemTime,
        name: String,
        rssi: i16,
        payload: [u8; PAYLOAD_LEN],
    ) -> Self {
        Self {
            address,
            observed_at,
            name,
            rssi,
            payload,
        }
    }

    /// Hardware address, e.g. `AA:BB:CC:DD:EE:FF`.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn observed_at(&self) -> SystemTime {
        self.observed_at
    }

    /// Time since the reading was observed. Zero if the clock went backwards.
    pub fn age(&self) -> Duration {
        self.observed_at.elapsed().unwrap_or_default()
    }

    /// Advertised name with control characters removed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal strength in dBm.
    pub fn rssi(&self) -> i16 {
        self.rssi
    }

    pub fn payload(&self) -> &[u8; PAYLOAD_LEN] {
        &self.payload
    }

    /// Temperature code as sent by the sensor.
    pub fn raw_temperature(&self) -> u8 {
        self.payload[4] & 0x7F
    }

    pub fn temperature_celsius(&self) -> f64 {
        f64::from(self.raw_temperature()) - 40.0
    }

    pub fn temperature_fahrenheit(&self) -> f64 {
        self.temperature_celsius() * 1.8 + 32.0
    }

    /// 14 bit tank level field from bytes 5-6.
    pub fn raw_tank_level(&self) -> u16 {
        ((u16::from(self.payload[6]) << 8) | u16::from(self.payload[5])) & 0x3FFF
    }

    /// Liquid height above the tank bottom in millimeters, temperature compensated.
    pub fn tank_level_mm(&self) -> f64 {
        let [c0, c1, c2] = PROPANE_LEVEL_COEFFICIENTS;
        let t = f64::from(self.raw_temperature());
        f64::from(self.raw_tank_level()) * (c0 + (c1 * t) + (c2 * t * t))
    }

    pub fn tank_level_inches(&self) -> f64 {
        self.tank_level_mm() / MM_PER_INCH
    }

    /// Fill percentage for a tank profile identifier such as `20lb_v`.
    ///
    /// Unknown identifiers yield 0.
    pub fn level_percent(&self, profile_id: &str) -> f64 {
        TankProfile::lookup(profile_id).map_or(0.0, |p| self.level_percent_for(p))
    }

    pub fn level_percent_for(&self, profile: TankProfile) -> f64 {
        profile.fill_percent(self.tank_level_mm())
    }

    /// Read quality, 0 (worst) to 3 (best).
    pub fn read_quality(&self) -> u8 {
        self.payload[6] >> 6
    }

    pub fn accel_x(&self) -> u8 {
        self.payload[10]
    }

    pub fn accel_y(&self) -> u8 {
        self.payload[11]
    }

    pub fn battery_voltage(&self) -> f64 {
        f64::from(self.payload[3] & 0x7F) / 32.0
    }

    /// Battery charge estimate, linear between 2.2 V and 2.85 V.
    pub fn battery_percent(&self) -> u8 {
        let percent =
            (self.battery_voltage() - BATTERY_EMPTY_VOLTS) / BATTERY_RANGE_VOLTS * 100.0;
        percent.clamp(0.0, 100.0).round() as u8
    }

    pub fn sensor_type(&self) -> SensorType {
        SensorType::from_code(self.payload[2])
    }

    /// Label of [`Self::sensor_type`], empty if unknown.
    pub fn sensor_type_label(&self) -> &'static str {
        self.sensor_type().label()
    }
}
