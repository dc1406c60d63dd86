// Email alerts for battery over-temperature
use crate::application::dashboard_client::Notifier;
use crate::domain::notification::Notification;
use crate::domain::reading::Reading;
use crate::infrastructure::config::AlertSettings;
use anyhow::Context;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::{Duration, Instant};

pub const ALERT_SUBJECT: &str = "⚠️ BMS Alert: Critical Battery Temperature";

/// Plain-text body of an over-temperature alert
pub fn alert_body(temperature: f64, reading: &Reading) -> String {
    format!(
        "Battery Monitoring System Alert\n\
         ----------------------------------\n\
         ⚠️ High Temperature Detected!\n\n\
         📈 Temperature: {:.1} °C\n\
         🔋 Battery Voltage: {:.2} V\n\
         🔌 Load Voltage: {:.2} V\n\
         ⚡ Current: {:.3} A\n\
         ⚡ Power: {:.2} W\n\n\
         Immediate inspection is recommended.",
        temperature, reading.battery_voltage, reading.load_voltage, reading.current, reading.power
    )
}

pub fn alert_message(
    from: &Mailbox,
    to: &Mailbox,
    temperature: f64,
    reading: &Reading,
) -> anyhow::Result<Message> {
    Message::builder()
        .from(from.clone())
        .to(to.clone())
        .subject(ALERT_SUBJECT)
        .header(ContentType::TEXT_PLAIN)
        .body(alert_body(temperature, reading))
        .context("Failed to build alert email")
}

#[derive(Debug)]
struct Cooldown {
    period: Duration,
    last_sent: Option<Instant>,
}

impl Cooldown {
    fn new(period: Duration) -> Self {
        Self {
            period,
            last_sent: None,
        }
    }

    fn try_acquire(&mut self, now: Instant) -> bool {
        match self.last_sent {
            Some(last) if now.saturating_duration_since(last) < self.period => false,
            _ => {
                self.last_sent = Some(now);
                true
            }
        }
    }
}

/// Emails the configured recipient when a notification carries a reading
/// above the alert temperature.
pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    threshold: f64,
    cooldown: Cooldown,
}

impl EmailNotifier {
    pub fn new(settings: &AlertSettings) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
            .with_context(|| format!("Invalid SMTP host {}", settings.smtp_host))?
            .port(settings.smtp_port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self {
            transport,
            from: parse_mailbox(&settings.from)?,
            to: parse_mailbox(&settings.to)?,
            threshold: settings.temperature_threshold,
            cooldown: Cooldown::new(Duration::from_secs(settings.cooldown_secs)),
        })
    }

    fn over_temperature<'a>(&self, notification: &'a Notification) -> Option<(f64, &'a Reading)> {
        let reading = &notification.reading.as_ref()?.reading;
        reading
            .temperature
            .filter(|t| *t > self.threshold)
            .map(|t| (t, reading))
    }
}

fn parse_mailbox(address: &str) -> anyhow::Result<Mailbox> {
    address
        .parse()
        .with_context(|| format!("Invalid email address {}", address))
}

impl Notifier for EmailNotifier {
    fn notify(&mut self, notification: &Notification) {
        let Some((temperature, reading)) = self.over_temperature(notification) else {
            return;
        };

        if !self.cooldown.try_acquire(Instant::now()) {
            tracing::debug!("Alert email suppressed, one was sent within {:?}", self.cooldown.period);
            return;
        }

        let message = match alert_message(&self.from, &self.to, temperature, reading) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!("{:#}", e);
                return;
            }
        };

        let transport = self.transport.clone();
        tokio::spawn(async move {
            match transport.send(message).await {
                Ok(_) => tracing::info!("Email alert sent ({:.1} °C)", temperature),
                Err(e) => tracing::error!("Failed to send email alert: {}", e),
            }
        });
    }
}
