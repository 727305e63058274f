// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::infrastructure::performance_monitor::PerformanceMonitor;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub dashboard_service: Arc<DashboardService>,
    pub performance_monitor: Arc<PerformanceMonitor>,
    /// Bumped on every store notification
    pub updates: watch::Receiver<u64>,
    pub default_page_size: i64,
}
