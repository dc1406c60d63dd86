// User-facing alerts
use super::reading::ClassifiedReading;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    #[serde(rename = "level")]
    pub severity: Severity,
    #[serde(with = "clock_format")]
    pub timestamp: NaiveTime,
    /// The reading that raised this notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<ClassifiedReading>,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity, timestamp: NaiveTime) -> Self {
        Self {
            message: message.into(),
            severity,
            timestamp,
            reading: None,
        }
    }

    pub fn anomaly(update: &ClassifiedReading) -> Self {
        Self {
            reading: Some(update.clone()),
            ..Self::new(
                format!("Anomaly detected: {}", update.status.describe()),
                Severity::Warning,
                update.reading.timestamp.time(),
            )
        }
    }

    /// Sent when readings return to normal after an anomaly
    pub fn recovered(update: &ClassifiedReading) -> Self {
        Self {
            reading: Some(update.clone()),
            ..Self::new(
                "Battery readings back to normal",
                Severity::Info,
                update.reading.timestamp.time(),
            )
        }
    }
}

mod clock_format {
    use crate::domain::reading::CLOCK_FORMAT;
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(CLOCK_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&text, CLOCK_FORMAT).map_err(serde::de::Error::custom)
    }
}
