// Mapper from application views to JSON response bodies
use crate::application::dashboard_service::{DashboardView, StoreStatus};
use crate::domain::query::{FilterState, PageInfo, SortConfig, Statistics};
use crate::domain::reading::Reading;
use crate::infrastructure::performance_monitor::PerformanceSummary;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRow {
    #[serde(flatten)]
    pub reading: Reading,
    pub air_quality_level: &'static str,
    pub air_quality_class: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResponse {
    pub readings: Vec<ReadingRow>,
    pub page: PageInfo,
    pub statistics: Option<Statistics>,
    pub total_readings: usize,
    pub is_connected: bool,
    pub error: Option<String>,
    pub filters: FilterState,
    pub sort: SortConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub data_count: usize,
    pub is_connected: bool,
    pub error: Option<String>,
    pub sample_data: Vec<ReadingRow>,
    pub subscriber_count: usize,
    pub performance: PerformanceSummary,
}

pub fn reading_to_row(reading: Reading) -> ReadingRow {
    let level = reading.air_quality_level();
    ReadingRow {
        reading,
        air_quality_level: level.label(),
        air_quality_class: level.class_name(),
    }
}

pub fn view_to_response(view: DashboardView) -> ViewResponse {
    ViewResponse {
        readings: view.readings.into_iter().map(reading_to_row).collect(),
        page: view.page,
        statistics: view.statistics,
        total_readings: view.total_readings,
        is_connected: view.is_connected,
        error: view.error,
        filters: view.filters,
        sort: view.sort,
    }
}

pub fn status_to_response(status: StoreStatus, performance: PerformanceSummary) -> StatusResponse {
    StatusResponse {
        data_count: status.reading_count,
        is_connected: status.is_connected,
        error: status.error,
        sample_data: status.sample.into_iter().map(reading_to_row).collect(),
        subscriber_count: status.subscriber_count,
        performance,
    }
}
