// Dashboard client - Applies push events to a view and drives rendering
use crate::domain::dashboard::{ChartId, DashboardSnapshot, DashboardView};
use crate::domain::events::PushEvent;
use crate::domain::notification::{Notification, Severity};
use crate::domain::rolling_buffer::{BufferError, SeriesSnapshot};
use tokio::sync::{broadcast, watch};

/// Redraws a chart from its current window.
pub trait Renderer: Send {
    fn render(&mut self, chart: ChartId, snapshot: &SeriesSnapshot);
}

/// Shows a message to the user.
pub trait Notifier: Send {
    fn notify(&mut self, notification: &Notification);
}

pub struct DashboardClient<R, N> {
    view: DashboardView,
    renderer: R,
    notifier: N,
}

impl<R: Renderer, N: Notifier> DashboardClient<R, N> {
    pub fn new(view: DashboardView, renderer: R, notifier: N) -> Self {
        Self {
            view,
            renderer,
            notifier,
        }
    }

    pub fn handle(&mut self, event: &PushEvent) -> Result<(), BufferError> {
        match event {
            PushEvent::BatteryUpdate(update) => {
                let changes = self.view.apply(update)?;
                for chart in changes.iter() {
                    let buffer = self.view.chart(chart);
                    tracing::trace!(?chart, len = buffer.len(), capacity = buffer.capacity(), "Redrawing chart");
                    let snapshot = buffer.snapshot();
                    self.renderer.render(chart, &snapshot);
                }
            }
            PushEvent::Notification(notification) => self.notifier.notify(notification),
        }
        Ok(())
    }

    pub fn view(&self) -> &DashboardView {
        &self.view
    }
}

/// Feed events from the monitor into `client` one at a time and publish the
/// resulting dashboard state. Returns once the channel closes.
pub async fn run_client<R: Renderer, N: Notifier>(
    mut rx: broadcast::Receiver<PushEvent>,
    mut client: DashboardClient<R, N>,
    published: watch::Sender<DashboardSnapshot>,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Err(e) = client.handle(&event) {
                    tracing::error!("Dropping dashboard update: {}", e);
                    continue;
                }
                published.send_replace(client.view().snapshot());
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Dashboard client lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Pass every notification the monitor publishes to `notifier`, ignoring
/// battery updates. Returns once the channel closes.
pub async fn run_notifier<N: Notifier>(mut rx: broadcast::Receiver<PushEvent>, mut notifier: N) {
    loop {
        match rx.recv().await {
            Ok(PushEvent::Notification(notification)) => notifier.notify(&notification),
            Ok(PushEvent::BatteryUpdate(_)) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Notifier lagged, skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Renderer that writes chart updates to the log
#[derive(Debug, Default)]
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn render(&mut self, chart: ChartId, snapshot: &SeriesSnapshot) {
        let latest: Vec<f64> = snapshot
            .series
            .iter()
            .filter_map(|track| track.last().copied())
            .collect();
        tracing::info!(
            ?chart,
            points = snapshot.labels.len(),
            ?latest,
            "Chart updated"
        );
    }
}

#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&mut self, notification: &Notification) {
        match notification.severity {
            Severity::Warning => tracing::warn!(at = %notification.timestamp, "{}", notification.message),
            Severity::Info => tracing::info!(at = %notification.timestamp, "{}", notification.message),
        }
    }
}
