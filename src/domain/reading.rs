// Battery reading domain model and anomaly classification
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const CLOCK_FORMAT: &str = "%H:%M:%S";

/// One telemetry sample from the battery pack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub battery_voltage: f64,
    pub load_voltage: f64,
    pub current: f64,
    pub power: f64,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    #[serde(with = "timestamp_format")]
    pub timestamp: NaiveDateTime,
}

impl Reading {
    pub fn timestamp_text(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn clock_text(&self) -> String {
        self.timestamp.format(CLOCK_FORMAT).to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    Normal,
    VoltageAnomaly,
    TemperatureAnomaly,
}

impl ReadingStatus {
    pub fn is_normal(self) -> bool {
        self == ReadingStatus::Normal
    }

    /// Human readable form, e.g. "voltage anomaly".
    pub fn describe(self) -> &'static str {
        match self {
            ReadingStatus::Normal => "normal",
            ReadingStatus::VoltageAnomaly => "voltage anomaly",
            ReadingStatus::TemperatureAnomaly => "temperature anomaly",
        }
    }
}

/// A reading together with the status the monitor assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedReading {
    #[serde(flatten)]
    pub reading: Reading,
    pub status: ReadingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Thresholds {
    pub voltage_min: f64,
    pub voltage_max: f64,
    /// Above this the monitor raises a temperature anomaly.
    pub temperature_max: f64,
    /// Above this the dashboard flags the temperature indicator.
    pub temperature_warn: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            voltage_min: 3.6,
            voltage_max: 4.1,
            temperature_max: 40.0,
            temperature_warn: 38.0,
        }
    }
}

impl Thresholds {
    /// Voltage anomalies win over temperature anomalies.
    pub fn classify(&self, reading: &Reading) -> ReadingStatus {
        if !self.voltage_in_range(reading) {
            ReadingStatus::VoltageAnomaly
        } else if reading.temperature.is_some_and(|t| t > self.temperature_max) {
            ReadingStatus::TemperatureAnomaly
        } else {
            ReadingStatus::Normal
        }
    }

    pub fn voltage_in_range(&self, reading: &Reading) -> bool {
        (self.voltage_min..=self.voltage_max).contains(&reading.battery_voltage)
    }

    /// `None` when the reading carries no temperature.
    pub fn temperature_in_range(&self, reading: &Reading) -> Option<bool> {
        reading.temperature.map(|t| t <= self.temperature_warn)
    }
}

pub mod timestamp_format {
    use super::TIMESTAMP_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
pub(crate) fn sample_reading(voltage: f64, temperature: Option<f64>) -> Reading {
    Reading {
        battery_voltage: voltage,
        load_voltage: voltage,
        current: 1.25,
        power: voltage * 1.25,
        temperature,
        humidity: None,
        timestamp: NaiveDateTime::parse_from_str("2024-05-01 12:30:45", TIMESTAMP_FORMAT).unwrap(),
    }
}
