// Application state for HTTP handlers
use crate::application::monitor_service::MonitorService;
use crate::domain::dashboard::DashboardSnapshot;
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub monitor: MonitorService,
    pub dashboard: Option<watch::Receiver<DashboardSnapshot>>,
}
