// Sensor gateway client - raw ADC/INA219/DHT22 values over HTTP
use crate::application::reading_source::ReadingSource;
use crate::domain::reading::Reading;
use crate::infrastructure::config::{AdcCalibration, GatewaySettings};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

/// Raw values as reported by the gateway, before calibration.
#[derive(Debug, Clone, Deserialize)]
struct RawSample {
    adc_raw: f64,
    load_voltage: f64,
    current_ma: f64,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GatewaySource {
    url: String,
    device: String,
    calibration: AdcCalibration,
    client: reqwest::Client,
}

impl GatewaySource {
    pub fn new(settings: GatewaySettings) -> Self {
        Self {
            url: settings.url.trim_end_matches('/').to_string(),
            device: settings.device,
            calibration: settings.calibration,
            client: reqwest::Client::new(),
        }
    }

    fn sample_url(&self) -> String {
        format!("{}/sample?device={}", self.url, urlencoding::encode(&self.device))
    }

    fn convert(&self, raw: RawSample) -> Reading {
        let cal = &self.calibration;
        let adc_voltage = raw.adc_raw * cal.reference_voltage / cal.max_reading;
        let current = raw.current_ma / 1000.0;

        Reading {
            battery_voltage: adc_voltage * cal.divider_ratio * cal.scale,
            load_voltage: raw.load_voltage,
            current,
            power: raw.load_voltage * current.abs(),
            temperature: raw.temperature,
            humidity: raw.humidity,
            timestamp: chrono::Local::now().naive_local(),
        }
    }
}

#[async_trait]
impl ReadingSource for GatewaySource {
    async fn read(&self) -> Result<Reading> {
        let url = self.sample_url();

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to reach sensor gateway")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Sensor gateway returned {}: {}", status, body);
        }

        let raw = response
            .json::<RawSample>()
            .await
            .context("Failed to parse sensor gateway sample")?;

        tracing::trace!("Raw sample from {}: {:?}", self.device, raw);
        Ok(self.convert(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> GatewaySource {
        GatewaySource::new(GatewaySettings {
            url: "http://gateway.local:8000/".to_string(),
            device: "pack 1".to_string(),
            calibration: AdcCalibration::default(),
        })
    }

    #[test]
    fn test_sample_url_is_encoded() {
        assert_eq!(source().sample_url(), "http://gateway.local:8000/sample?device=pack%201");
    }

    #[test]
    fn test_convert_applies_calibration() {
        let raw: RawSample = serde_json::from_str(
            r#"{"adc_raw": 6000, "load_voltage": 3.7, "current_ma": -1500, "temperature": 29.5}"#,
        )
        .unwrap();
        let reading = source().convert(raw);

        let expected_voltage = 6000.0 * 4.096 / 32767.0 * 5.0;
        assert!((reading.battery_voltage - expected_voltage).abs() < 1e-9);
        assert_eq!(reading.current, -1.5);
        assert!((reading.power - 5.55).abs() < 1e-9);
        assert_eq!(reading.temperature, Some(29.5));
        assert_eq!(reading.humidity, None);
    }
}
