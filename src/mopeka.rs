//! Mopeka Pro Check advertisement format.
//!
//! The sensor broadcasts a 12 byte manufacturer-specific data block:
//!
//! | Byte  | Contents                                               |
//! |-------|--------------------------------------------------------|
//! | 0-1   | Manufacturer ID `0x0059`, little-endian                |
//! | 2     | Sensor type code                                       |
//! | 3     | Battery voltage, low 7 bits, 1/32 V steps              |
//! | 4     | Temperature code, low 7 bits, offset by 40 °C          |
//! | 5-6   | Tank level (14 bits) with read quality in the top 2    |
//! | 7-9   | Low bytes of the sensor's MAC address                  |
//! | 10-11 | Accelerometer X and Y                                  |

use crate::reading::SensorReading;
use std::fmt;
use std::time::SystemTime;

/// Mopeka IoT manufacturer ID.
pub const MOPEKA_MANUFACTURER_ID: u16 = 0x0059;

/// Manufacturer ID as it appears on the wire.
pub const MOPEKA_MANUFACTURER_ID_BYTES: [u8; 2] = MOPEKA_MANUFACTURER_ID.to_le_bytes();

/// Exact length of a Pro Check payload, manufacturer ID included.
pub const PAYLOAD_LEN: usize = 12;

/// Tank level polynomial coefficients for propane, evaluated against the raw
/// temperature code.
pub const PROPANE_LEVEL_COEFFICIENTS: [f64; 3] = [0.573045, -0.002822, -0.00000535];

/// Kind of measurement the sensor is configured for (payload byte 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorType {
    StandardPropane,
    TopDownAirSpace,
    BottomUpWater,
    /// A code this decoder does not know. Not an error.
    Unknown(u8),
}

impl SensorType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x03 => SensorType::StandardPropane,
            0x04 => SensorType::TopDownAirSpace,
            0x05 => SensorType::BottomUpWater,
            other => SensorType::Unknown(other),
        }
    }

    /// Human-readable label, empty for unknown codes.
    pub fn label(self) -> &'static str {
        match self {
            SensorType::StandardPropane => "Standard Propane",
            SensorType::TopDownAirSpace => "Top down air space",
            SensorType::BottomUpWater => "Bottom up water",
            SensorType::Unknown(_) => "",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Check whether a manufacturer data block looks like a Pro Check payload.
///
/// Returns `true` only when the block starts with `vendor_id` (little-endian)
/// and is exactly [`PAYLOAD_LEN`] bytes long. Everything else is unrelated
/// radio traffic.
pub fn admit(vendor_id: u16, payload: &[u8]) -> bool {
    match payload {
        [lo, hi, ..] => u16::from_le_bytes([*lo, *hi]) == vendor_id && payload.len() == PAYLOAD_LEN,
        _ => false,
    }
}

/// Keep only the printable characters of an advertised device name.
///
/// Drops control and format characters, line and paragraph separators and
/// private-use code points. Ordinary spaces are kept.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars().filter(|&c| is_printable(c)).collect()
}

fn is_printable(c: char) -> bool {
    if c.is_control() {
        return false;
    }
    // Unicode categories Cf, Zl, Zp and Co
    !matches!(
        c,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{0890}'..='\u{0891}'
            | '\u{08E2}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{2028}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{E000}'..='\u{F8FF}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{110BD}'
            | '\u{110CD}'
            | '\u{13430}'..='\u{1343F}'
            | '\u{1BCA0}'..='\u{1BCA3}'
            | '\u{1D173}'..='\u{1D17A}'
            | '\u{E0001}'
            | '\u{E0020}'..='\u{E007F}'
            | '\u{F0000}'..='\u{10FFFF}'
    )
}

/// Decode a Mopeka manufacturer data block into a [`SensorReading`].
///
/// Returns `None` for anything [`admit`] rejects. The payload is stored
/// verbatim; engineering units are computed by the reading's accessors.
///
/// # Arguments
/// * `address` - Hardware address of the sender
/// * `observed_at` - When the advertisement was received
/// * `raw_name` - Advertised local name, may contain garbage
/// * `rssi` - Received signal strength in dBm
/// * `payload` - Manufacturer data including the two manufacturer ID bytes
pub fn decode(
    address: &str,
    observed_at: SystemTime,
    raw_name: &str,
    rssi: i16,
    payload: &[u8],
) -> Option<SensorReading> {
    if !admit(MOPEKA_MANUFACTURER_ID, payload) {
        return None;
    }

    let payload: [u8; PAYLOAD_LEN] = payload.try_into().ok()?;

    Some(SensorReading::new(
        address.to_string(),
        observed_at,
        sanitize_name(raw_name),
        rssi,
        payload,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TEST_ADDRESS, sample_payload};

    #[test]
    fn test_manufacturer_id_bytes() {
        assert_eq!(MOPEKA_MANUFACTURER_ID_BYTES, [0x59, 0x00]);
    }

    #[test]
    fn test_admit_valid_payload() {
        assert!(admit(MOPEKA_MANUFACTURER_ID, &sample_payload()));
    }

    #[test]
    fn test_admit_rejects_wrong_length() {
        let payload = sample_payload();
        assert!(!admit(MOPEKA_MANUFACTURER_ID, &payload[..11]));

        let mut long = payload.to_vec();
        long.push(0x00);
        assert!(!admit(MOPEKA_MANUFACTURER_ID, &long));
    }

    #[test]
    fn test_admit_rejects_wrong_vendor() {
        let mut payload = sample_payload();
        payload[0] = 0x99;
        payload[1] = 0x04;
        assert!(!admit(MOPEKA_MANUFACTURER_ID, &payload));

        // Byte order matters
        let mut swapped = sample_payload();
        swapped[0] = 0x00;
        swapped[1] = 0x59;
        assert!(!admit(MOPEKA_MANUFACTURER_ID, &swapped));
    }

    #[test]
    fn test_admit_rejects_short_blocks() {
        assert!(!admit(MOPEKA_MANUFACTURER_ID, &[]));
        assert!(!admit(MOPEKA_MANUFACTURER_ID, &[0x59]));
        assert!(!admit(MOPEKA_MANUFACTURER_ID, &[0x59, 0x00]));
    }

    #[test]
    fn test_admit_other_vendor_id() {
        let mut payload = sample_payload();
        payload[0] = 0x99;
        payload[1] = 0x04;
        assert!(admit(0x0499, &payload));
    }

    #[test]
    fn test_decode_rejects_foreign_payloads() {
        let now = SystemTime::now();
        assert!(decode(TEST_ADDRESS, now, "", -60, &[]).is_none());
        assert!(decode(TEST_ADDRESS, now, "", -60, &[0x59, 0x00, 0x03]).is_none());

        let mut foreign = sample_payload();
        foreign[0] = 0x4C;
        assert!(decode(TEST_ADDRESS, now, "", -60, &foreign).is_none());
    }

    #[test]
    fn test_decode_keeps_metadata() {
        let now = SystemTime::now();
        let reading = decode(TEST_ADDRESS, now, "M1017", -71, &sample_payload()).unwrap();

        assert_eq!(reading.address(), TEST_ADDRESS);
        assert_eq!(reading.observed_at(), now);
        assert_eq!(reading.name(), "M1017");
        assert_eq!(reading.rssi(), -71);
        assert_eq!(reading.payload(), &sample_payload());
    }

    #[test]
    fn test_decode_sanitizes_name() {
        let now = SystemTime::now();
        let reading = decode(TEST_ADDRESS, now, "\0M10\u{7}17\n", -71, &sample_payload()).unwrap();
        assert_eq!(reading.name(), "M1017");
    }

    #[test]
    fn test_decode_is_deterministic() {
        let now = SystemTime::now();
        let a = decode(TEST_ADDRESS, now, "tank", -50, &sample_payload()).unwrap();
        let b = decode(TEST_ADDRESS, now, "tank", -50, &sample_payload()).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.tank_level_mm(), b.tank_level_mm());
        assert_eq!(a.temperature_celsius(), b.temperature_celsius());
        assert_eq!(a.battery_percent(), b.battery_percent());
        assert_eq!(a.level_percent("500g_h"), b.level_percent("500g_h"));
    }

    #[test]
    fn test_sensor_type_lookup() {
        assert_eq!(SensorType::from_code(0x03), SensorType::StandardPropane);
        assert_eq!(SensorType::from_code(0x04), SensorType::TopDownAirSpace);
        assert_eq!(SensorType::from_code(0x05), SensorType::BottomUpWater);
        assert_eq!(SensorType::from_code(0x42), SensorType::Unknown(0x42));
    }

    #[test]
    fn test_sensor_type_labels() {
        assert_eq!(SensorType::StandardPropane.label(), "Standard Propane");
        assert_eq!(format!("{}", SensorType::BottomUpWater), "Bottom up water");
        assert_eq!(SensorType::Unknown(0).label(), "");
    }

    #[test]
    fn test_sanitize_name_keeps_printable() {
        assert_eq!(sanitize_name("Tank 1 (grill)"), "Tank 1 (grill)");
        assert_eq!(sanitize_name("Säiliö"), "Säiliö");
        assert_eq!(sanitize_name("\u{1b}[31m"), "[31m");
    }

    #[test]
    fn test_sanitize_name_drops_invisible_characters() {
        assert_eq!(sanitize_name("\u{200B}M10\u{FEFF}17\u{2028}"), "M1017");
        assert_eq!(sanitize_name("M\u{00AD}1017\u{2029}"), "M1017");
        assert_eq!(sanitize_name("\u{202E}M1017\u{E000}"), "M1017");
        // Non-breaking space is a space separator and stays
        assert_eq!(sanitize_name("M\u{00A0}1017"), "M\u{00A0}1017");
    }
}
