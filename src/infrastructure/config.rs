use crate::domain::dashboard::DEFAULT_CHART_CAPACITY;
use crate::domain::reading::Thresholds;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub gateway: Option<GatewaySettings>,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub dashboard: DashboardSettings,
    #[serde(default)]
    pub alerts: Option<AlertSettings>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Simulated,
    Gateway,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorSettings {
    pub source: SourceKind,
    pub sample_interval_ms: u64,
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl MonitorSettings {
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewaySettings {
    pub url: String,
    pub device: String,
    #[serde(default)]
    pub calibration: AdcCalibration,
}

/// ADC front end of the battery voltage channel
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct AdcCalibration {
    pub reference_voltage: f64,
    pub max_reading: f64,
    pub divider_ratio: f64,
    pub scale: f64,
}

impl Default for AdcCalibration {
    fn default() -> Self {
        Self {
            reference_voltage: 4.096,
            max_reading: 32767.0,
            divider_ratio: 1.0,
            scale: 5.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    #[serde(default = "default_chart_capacity")]
    pub chart_capacity: usize,
    #[serde(default = "default_true")]
    pub local_client: bool,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            chart_capacity: DEFAULT_CHART_CAPACITY,
            local_client: true,
        }
    }
}

/// Email alerts for high battery temperature
#[derive(Debug, Deserialize, Clone)]
pub struct AlertSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
    #[serde(default = "default_alert_temperature")]
    pub temperature_threshold: f64,
    /// Minimum gap between two alert emails
    #[serde(default = "default_alert_cooldown")]
    pub cooldown_secs: u64,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_alert_temperature() -> f64 {
    40.0
}

fn default_alert_cooldown() -> u64 {
    300
}

fn default_history_size() -> usize {
    20
}

fn default_broadcast_capacity() -> usize {
    64
}

fn default_chart_capacity() -> usize {
    DEFAULT_CHART_CAPACITY
}

fn default_true() -> bool {
    true
}

/// Load `config/default`, an optional `config/local` override, then
/// `BMS__SECTION__KEY` environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from(Path::new("config"), None)
}

/// `env` replaces the process environment when given.
fn load_app_config_from(
    dir: &Path,
    env: Option<config::Map<String, String>>,
) -> anyhow::Result<AppConfig> {
    let default = dir.join("default");
    let local = dir.join("local");

    let settings = config::Config::builder()
        .add_source(config::File::with_name(&default.to_string_lossy()))
        .add_source(config::File::with_name(&local.to_string_lossy()).required(false))
        .add_source(
            config::Environment::with_prefix("BMS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(env),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const BASE: &str = r#"
        [server]
        bind = "0.0.0.0:5000"

        [monitor]
        source = "simulated"
        sample_interval_ms = 2000

        [dashboard]
        chart_capacity = 20
    "#;

    fn env(vars: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn parse(toml: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let config = parse(
            r#"
            [server]
            bind = "127.0.0.1:5000"

            [monitor]
            source = "simulated"
            sample_interval_ms = 2000
            "#,
        );

        assert_eq!(config.monitor.source, SourceKind::Simulated);
        assert_eq!(config.monitor.sample_interval(), Duration::from_secs(2));
        assert_eq!(config.monitor.history_size, 20);
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.dashboard.chart_capacity, 20);
        assert!(config.gateway.is_none());
    }

    #[test]
    fn test_gateway_section() {
        let config = parse(
            r#"
            [server]
            bind = "0.0.0.0:5000"

            [monitor]
            source = "gateway"
            sample_interval_ms = 500

            [gateway]
            url = "http://10.0.0.7:8000"
            device = "pack-1"

            [thresholds]
            voltage_min = 3.5
            voltage_max = 4.2
            temperature_max = 45.0
            temperature_warn = 42.0
            "#,
        );

        let gateway = config.gateway.unwrap();
        assert_eq!(gateway.device, "pack-1");
        assert_eq!(gateway.calibration, AdcCalibration::default());
        assert_eq!(config.thresholds.voltage_max, 4.2);
    }

    #[test]
    fn test_local_file_overrides_default() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("default.toml"), BASE).unwrap();
        std::fs::write(
            dir.path().join("local.toml"),
            "[monitor]\nsample_interval_ms = 250\n",
        )
        .unwrap();

        let config = load_app_config_from(dir.path(), env(&[])).unwrap();
        assert_eq!(config.monitor.sample_interval(), Duration::from_millis(250));
        assert_eq!(config.monitor.source, SourceKind::Simulated);
    }

    #[test]
    fn test_missing_local_file_is_fine() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("default.toml"), BASE).unwrap();

        let config = load_app_config_from(dir.path(), env(&[])).unwrap();
        assert_eq!(config.monitor.sample_interval(), Duration::from_secs(2));
        assert!(config.alerts.is_none());
    }

    #[test]
    fn test_environment_overrides_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("default.toml"), BASE).unwrap();
        std::fs::write(dir.path().join("local.toml"), "[dashboard]\nchart_capacity = 50\n").unwrap();

        let config = load_app_config_from(
            dir.path(),
            env(&[
                ("BMS__DASHBOARD__CHART_CAPACITY", "75"),
                ("BMS__DASHBOARD__LOCAL_CLIENT", "false"),
                ("BMS__SERVER__BIND", "127.0.0.1:9000"),
                ("OTHER__SERVER__BIND", "ignored"),
            ]),
        )
        .unwrap();

        assert_eq!(config.dashboard.chart_capacity, 75);
        assert!(!config.dashboard.local_client);
        assert_eq!(config.server.bind, "127.0.0.1:9000");
    }

    #[test]
    fn test_alerts_section_defaults() {
        let config = parse(&format!(
            "{}{}",
            BASE,
            r#"
            [alerts]
            smtp_host = "smtp.gmail.com"
            username = "bms@example.com"
            password = "secret"
            from = "bms@example.com"
            to = "ops@example.com"
            "#
        ));

        let alerts = config.alerts.unwrap();
        assert!(alerts.enabled);
        assert_eq!(alerts.smtp_port, 587);
        assert_eq!(alerts.temperature_threshold, 40.0);
        assert_eq!(alerts.cooldown_secs, 300);
    }
}
