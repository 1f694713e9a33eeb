//! InfluxDB line protocol output formatter.

use crate::output::OutputFormatter;
use crate::reading::SensorReading;
use crate::tank::TankProfile;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Field values for InfluxDB line protocol
#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Float(num) => write!(f, "{num}"),
            FieldValue::Integer(num) => write!(f, "{num}i"),
        }
    }
}

/// Data point in InfluxDB line protocol
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<String, String>,
    pub field_set: BTreeMap<String, FieldValue>,
    pub timestamp: Option<SystemTime>,
}

/// Escape commas, equals signs and spaces in tag keys and values.
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn fmt_tags(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    for (key, value) in data_point.tag_set.iter() {
        // Empty tag values are not allowed by the protocol
        if value.is_empty() {
            continue;
        }
        write!(fmt, ",{}={}", escape_tag(key), escape_tag(value))?;
    }
    Ok(())
}

fn fmt_fields(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    let mut first = true;
    for (key, value) in data_point.field_set.iter() {
        if first {
            first = false;
        } else {
            write!(fmt, ",")?;
        }
        write!(fmt, "{}={}", key, value)?;
    }
    Ok(())
}

fn fmt_timestamp(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    // Times before the epoch are written without a timestamp
    if let Some(nanos) = data_point
        .timestamp
        .and_then(|time| time.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_nanos())
    {
        write!(fmt, " {}", nanos)?;
    }
    Ok(())
}

impl fmt::Display for DataPoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.measurement)?;
        fmt_tags(self, fmt)?;
        write!(fmt, " ")?;
        fmt_fields(self, fmt)?;
        fmt_timestamp(self, fmt)
    }
}

/// InfluxDB line protocol formatter.
///
/// Writes one point per reading, with the fill percentage computed for the
/// configured tank profile.
pub struct InfluxDbFormatter {
    /// The measurement name in InfluxDB
    measurement_name: String,
    tank: TankProfile,
}

impl InfluxDbFormatter {
    /// Create a new InfluxDB formatter.
    ///
    /// # Arguments
    /// * `measurement_name` - The measurement name to use in the line protocol
    /// * `tank` - Tank profile used for the `level_percent` field
    pub fn new(measurement_name: String, tank: TankProfile) -> Self {
        Self {
            measurement_name,
            tank,
        }
    }

    fn tag_set(&self, reading: &SensorReading) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        tags.insert("mac".to_string(), reading.address().to_string());
        tags.insert("name".to_string(), reading.name().to_string());
        tags.insert(
            "sensor_type".to_string(),
            reading.sensor_type_label().to_string(),
        );
        tags.insert("tank".to_string(), self.tank.id().to_string());
        tags
    }

    fn field_set(&self, r: &SensorReading) -> BTreeMap<String, FieldValue> {
        let mut fields = BTreeMap::new();

        macro_rules! float {
            ($name:literal, $val:expr) => {
                fields.insert($name.into(), FieldValue::Float($val));
            };
        }
        macro_rules! int {
            ($name:literal, $val:expr) => {
                fields.insert($name.into(), FieldValue::Integer(i64::from($val)));
            };
        }

        float!("temperature", r.temperature_celsius());
        float!("tank_level_mm", r.tank_level_mm());
        float!("tank_level_in", r.tank_level_inches());
        float!("level_percent", r.level_percent_for(self.tank));
        float!("battery_potential", r.battery_voltage());
        int!("battery_percent", r.battery_percent());
        int!("read_quality", r.read_quality());
        int!("rssi", r.rssi());
        int!("acceleration_x", r.accel_x());
        int!("acceleration_y", r.accel_y());

        fields
    }

    fn to_data_point(&self, reading: &SensorReading) -> DataPoint {
        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set: self.tag_set(reading),
            field_set: self.field_set(reading),
            timestamp: Some(reading.observed_at()),
        }
    }
}

impl OutputFormatter for InfluxDbFormatter {
    fn format(&self, reading: &SensorReading) -> String {
        format!("{}", self.to_data_point(reading))
    }
}
