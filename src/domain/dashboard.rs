// Dashboard view model - the state a live dashboard renders from
use super::reading::{ClassifiedReading, Thresholds};
use super::rolling_buffer::{BufferError, RollingSeriesBuffer, SeriesSnapshot};
use serde::Serialize;

pub const DEFAULT_CHART_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartId {
    /// Voltage and current on one chart
    Combined,
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Normal,
    Warning,
}

impl Indicator {
    pub fn from_ok(ok: bool) -> Self {
        if ok { Indicator::Normal } else { Indicator::Warning }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Tiles {
    pub voltage: Option<String>,
    pub current: Option<String>,
    pub power: Option<String>,
    pub temperature: Option<String>,
    pub last_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub tiles: Tiles,
    pub voltage_indicator: Option<Indicator>,
    pub temperature_indicator: Option<Indicator>,
    pub system_status: Indicator,
    pub last_anomaly: Option<String>,
    pub combined: SeriesSnapshot,
    pub temperature: SeriesSnapshot,
}

/// Which charts changed during an update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartChanges(Vec<ChartId>);

impl ChartChanges {
    pub fn iter(&self) -> impl Iterator<Item = ChartId> + '_ {
        self.0.iter().copied()
    }
}

pub struct DashboardView {
    thresholds: Thresholds,
    tiles: Tiles,
    voltage_indicator: Option<Indicator>,
    temperature_indicator: Option<Indicator>,
    system_status: Indicator,
    last_anomaly: Option<String>,
    combined: RollingSeriesBuffer,
    temperature: RollingSeriesBuffer,
}

impl DashboardView {
    pub fn new(thresholds: Thresholds, chart_capacity: usize) -> Self {
        Self {
            thresholds,
            tiles: Tiles::default(),
            voltage_indicator: None,
            temperature_indicator: None,
            system_status: Indicator::Normal,
            last_anomaly: None,
            combined: RollingSeriesBuffer::new(2, chart_capacity),
            temperature: RollingSeriesBuffer::new(1, chart_capacity),
        }
    }

    /// Fold one classified reading into the view. Returns the charts that
    /// received a new sample.
    pub fn apply(&mut self, update: &ClassifiedReading) -> Result<ChartChanges, BufferError> {
        let reading = &update.reading;
        let mut changes = Vec::new();

        self.tiles.voltage = Some(format!("{:.2} V", reading.battery_voltage));
        self.tiles.current = Some(format!("{:.3} A", reading.current));
        self.tiles.power = Some(format!("{:.2} W", reading.power));
        if let Some(temperature) = reading.temperature {
            self.tiles.temperature = Some(format!("{:.1} °C", temperature));
        }
        self.tiles.last_update = Some(reading.timestamp_text());

        self.voltage_indicator = Some(Indicator::from_ok(self.thresholds.voltage_in_range(reading)));
        if let Some(ok) = self.thresholds.temperature_in_range(reading) {
            self.temperature_indicator = Some(Indicator::from_ok(ok));
        }

        self.system_status = Indicator::from_ok(update.status.is_normal());
        if !update.status.is_normal() {
            self.last_anomaly = Some(format!(
                "{} ({})",
                reading.timestamp_text(),
                update.status.describe()
            ));
        }

        let label = reading.clock_text();
        self.combined
            .append(&[reading.battery_voltage, reading.current], label.clone())?;
        changes.push(ChartId::Combined);

        if let Some(temperature) = reading.temperature {
            self.temperature.append(&[temperature], label)?;
            changes.push(ChartId::Temperature);
        }

        Ok(ChartChanges(changes))
    }

    pub fn chart(&self, chart: ChartId) -> &RollingSeriesBuffer {
        match chart {
            ChartId::Combined => &self.combined,
            ChartId::Temperature => &self.temperature,
        }
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        DashboardSnapshot {
            tiles: self.tiles.clone(),
            voltage_indicator: self.voltage_indicator,
            temperature_indicator: self.temperature_indicator,
            system_status: self.system_status,
            last_anomaly: self.last_anomaly.clone(),
            combined: self.combined.snapshot(),
            temperature: self.temperature.snapshot(),
        }
    }
}
