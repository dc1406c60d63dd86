// Monitor service - Samples the battery, classifies and fans out push events
use crate::application::reading_source::ReadingSource;
use crate::domain::events::PushEvent;
use crate::domain::notification::Notification;
use crate::domain::reading::{ClassifiedReading, ReadingStatus, Thresholds};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct MonitorService {
    source: Arc<dyn ReadingSource>,
    thresholds: Thresholds,
    history: Arc<Mutex<VecDeque<ClassifiedReading>>>,
    history_size: usize,
    last_status: Arc<Mutex<ReadingStatus>>,
    events: broadcast::Sender<PushEvent>,
}

impl MonitorService {
    pub fn new(
        source: Arc<dyn ReadingSource>,
        thresholds: Thresholds,
        history_size: usize,
        broadcast_capacity: usize,
    ) -> Self {
        let (events, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            source,
            thresholds,
            history: Arc::new(Mutex::new(VecDeque::with_capacity(history_size))),
            history_size,
            last_status: Arc::new(Mutex::new(ReadingStatus::Normal)),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.events.subscribe()
    }

    /// Take one sample and publish it. Source failures are logged and the
    /// sample is skipped.
    pub async fn tick(&self) -> Option<ClassifiedReading> {
        let reading = match self.source.read().await {
            Ok(reading) => reading,
            Err(e) => {
                tracing::error!("Sensor reading failed: {:#}", e);
                return None;
            }
        };

        let status = self.thresholds.classify(&reading);
        let classified = ClassifiedReading { reading, status };
        self.record(classified.clone());

        tracing::debug!(
            "Reading {:.2} V, {:.3} A, status {:?}",
            classified.reading.battery_voltage,
            classified.reading.current,
            status
        );

        // A send error only means nobody is subscribed right now
        let _ = self.events.send(PushEvent::BatteryUpdate(classified.clone()));

        let previous = self.swap_status(status);
        if !status.is_normal() {
            let notification = Notification::anomaly(&classified);
            tracing::warn!("{}", notification.message);
            let _ = self.events.send(PushEvent::Notification(notification));
        } else if !previous.is_normal() {
            let notification = Notification::recovered(&classified);
            tracing::info!("{}", notification.message);
            let _ = self.events.send(PushEvent::Notification(notification));
        }

        Some(classified)
    }

    pub async fn run(&self, interval: Duration) {
        tracing::info!("Sampling battery every {:?}", interval);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Recent readings, newest first
    pub fn recent(&self) -> Vec<ClassifiedReading> {
        match self.history.lock() {
            Ok(history) => history.iter().rev().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().rev().cloned().collect(),
        }
    }

    pub fn latest(&self) -> Option<ClassifiedReading> {
        match self.history.lock() {
            Ok(history) => history.back().cloned(),
            Err(poisoned) => poisoned.into_inner().back().cloned(),
        }
    }

    fn swap_status(&self, status: ReadingStatus) -> ReadingStatus {
        let mut last = match self.last_status.lock() {
            Ok(last) => last,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *last, status)
    }

    fn record(&self, classified: ClassifiedReading) {
        let mut history = match self.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        };
        history.push_back(classified);
        while history.len() > self.history_size {
            history.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::Severity;
    use crate::domain::reading::{sample_reading, Reading};
    use async_trait::async_trait;

    struct ScriptedSource {
        readings: Mutex<VecDeque<Reading>>,
    }

    impl ScriptedSource {
        fn new(readings: Vec<Reading>) -> Arc<Self> {
            Arc::new(Self {
                readings: Mutex::new(readings.into()),
            })
        }
    }

    #[async_trait]
    impl ReadingSource for ScriptedSource {
        async fn read(&self) -> anyhow::Result<Reading> {
            self.readings
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("sensor unplugged"))
        }
    }

    #[tokio::test]
    async fn test_normal_reading_sends_single_update() {
        let source = ScriptedSource::new(vec![sample_reading(3.9, Some(30.0))]);
        let monitor = MonitorService::new(source, Thresholds::default(), 20, 16);
        let mut rx = monitor.subscribe();

        let classified = monitor.tick().await.unwrap();
        assert_eq!(classified.status, ReadingStatus::Normal);

        assert!(matches!(rx.try_recv().unwrap(), PushEvent::BatteryUpdate(_)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_anomaly_sends_notification_after_update() {
        let source = ScriptedSource::new(vec![sample_reading(3.9, Some(41.0))]);
        let monitor = MonitorService::new(source, Thresholds::default(), 20, 16);
        let mut rx = monitor.subscribe();

        monitor.tick().await;

        assert!(matches!(rx.try_recv().unwrap(), PushEvent::BatteryUpdate(_)));
        match rx.try_recv().unwrap() {
            PushEvent::Notification(n) => {
                assert_eq!(n.message, "Anomaly detected: temperature anomaly");
            }
            other => panic!("Expected Notification, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recovery_sends_info_notification_once() {
        let source = ScriptedSource::new(vec![
            sample_reading(3.9, Some(41.0)),
            sample_reading(3.9, Some(30.0)),
            sample_reading(3.9, Some(30.0)),
        ]);
        let monitor = MonitorService::new(source, Thresholds::default(), 20, 16);
        let mut rx = monitor.subscribe();

        for _ in 0..3 {
            monitor.tick().await;
        }

        let notices: Vec<Notification> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|event| match event {
                PushEvent::Notification(n) => Some(n),
                PushEvent::BatteryUpdate(_) => None,
            })
            .collect();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].severity, Severity::Warning);
        assert_eq!(notices[1].severity, Severity::Info);
        assert_eq!(notices[1].message, "Battery readings back to normal");
    }

    #[tokio::test]
    async fn test_source_error_skips_tick() {
        let source = ScriptedSource::new(vec![]);
        let monitor = MonitorService::new(source, Thresholds::default(), 20, 16);
        let mut rx = monitor.subscribe();

        assert!(monitor.tick().await.is_none());
        assert!(rx.try_recv().is_err());
        assert!(monitor.latest().is_none());
    }

    #[tokio::test]
    async fn test_history_is_bounded_and_newest_first() {
        let readings = (0..5).map(|i| sample_reading(3.7 + i as f64 * 0.1, None)).collect();
        let monitor = MonitorService::new(ScriptedSource::new(readings), Thresholds::default(), 3, 16);

        for _ in 0..5 {
            monitor.tick().await;
        }

        let recent = monitor.recent();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0], monitor.latest().unwrap());
        assert!(recent[0].reading.battery_voltage > recent[2].reading.battery_voltage);
    }
}
