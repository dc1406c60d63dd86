// Simulated battery pack for running without hardware
use crate::application::reading_source::ReadingSource;
use crate::domain::reading::Reading;
use async_trait::async_trait;
use rand::Rng;

#[derive(Debug, Default)]
pub struct SimulatedSource;

impl SimulatedSource {
    pub fn new() -> Self {
        Self
    }

    fn sample<R: Rng>(rng: &mut R) -> Reading {
        let voltage = round_to(rng.random_range(3.5..4.2), 2);
        let current = round_to(rng.random_range(0.5..2.5), 2);
        let temperature = round_to(rng.random_range(25.0..40.0), 1);

        Reading {
            battery_voltage: voltage,
            load_voltage: voltage,
            current,
            power: round_to(voltage * current, 2),
            temperature: Some(temperature),
            humidity: None,
            timestamp: chrono::Local::now().naive_local(),
        }
    }
}

#[async_trait]
impl ReadingSource for SimulatedSource {
    async fn read(&self) -> anyhow::Result<Reading> {
        Ok(Self::sample(&mut rand::rng()))
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
