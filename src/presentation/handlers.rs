// HTTP request handlers
use crate::application::dashboard_service::DashboardQuery;
use crate::domain::query::{FilterState, PageRequest, QueryError, SortConfig, SortDirection};
use crate::domain::reading::ReadingField;
use crate::presentation::app_state::AppState;
use crate::presentation::live_stream::{to_event, view_stream};
use crate::presentation::view_mapper::{
    status_to_response, view_to_response, StatusResponse, ViewResponse,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error(transparent)]
    Query(#[from] QueryError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

/// Filters, ordering and page selection, all optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewParams {
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub humidity_min: Option<f64>,
    pub humidity_max: Option<f64>,
    pub air_quality_min: Option<f64>,
    pub air_quality_max: Option<f64>,
    pub sort_key: Option<String>,
    pub sort_direction: Option<String>,
    /// Column-header click: flips or switches the requested ordering
    pub toggle: Option<String>,
    pub page_size: Option<i64>,
    pub page: Option<i64>,
}

impl ViewParams {
    pub fn to_query(&self, default_page_size: i64) -> Result<DashboardQuery, ApiError> {
        let filters = FilterState {
            temperature_min: self.temperature_min.unwrap_or(0.0),
            temperature_max: self.temperature_max.unwrap_or(0.0),
            humidity_min: self.humidity_min.unwrap_or(0.0),
            humidity_max: self.humidity_max.unwrap_or(0.0),
            air_quality_min: self.air_quality_min.unwrap_or(0.0),
            air_quality_max: self.air_quality_max.unwrap_or(0.0),
        };

        let mut sort = self.sort_config()?;
        if let Some(field) = &self.toggle {
            sort = sort.toggle(parse_field("toggle", field)?);
        }

        let page = PageRequest::new(
            self.page_size.unwrap_or(default_page_size),
            self.page.unwrap_or(1),
        )?;

        Ok(DashboardQuery { filters, sort, page })
    }

    fn sort_config(&self) -> Result<SortConfig, ApiError> {
        let default = SortConfig::default();

        let key = match self.sort_key.as_deref() {
            None => default.key,
            Some("none") | Some("") => None,
            Some(field) => Some(parse_field("sortKey", field)?),
        };

        let direction = match self.sort_direction.as_deref() {
            None => default.direction,
            Some("asc") | Some("ascending") => SortDirection::Ascending,
            Some("desc") | Some("descending") => SortDirection::Descending,
            Some(other) => {
                return Err(ApiError::InvalidParameter {
                    name: "sortDirection",
                    reason: format!("expected asc or desc, got {}", other),
                });
            }
        };

        Ok(SortConfig::new(key, direction))
    }
}

fn parse_field(name: &'static str, value: &str) -> Result<ReadingField, ApiError> {
    value
        .parse::<ReadingField>()
        .map_err(|reason| ApiError::InvalidParameter { name, reason })
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Filtered, sorted and paginated readings with statistics
pub async fn get_readings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewParams>,
) -> Result<Json<ViewResponse>, ApiError> {
    let query = params.to_query(state.default_page_size)?;
    let view = state.dashboard_service.build_view(&query);
    Ok(Json(view_to_response(view)))
}

/// Same view as `/readings`, pushed as server-sent events on every update
pub async fn stream_readings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ViewParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let query = params.to_query(state.default_page_size)?;
    tracing::debug!("Opening live view stream: {:?}", query);

    let stream = view_stream(state.dashboard_service.clone(), state.updates.clone(), query)
        .map(|view| to_event(&view));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Store diagnostics: counts, connection state, a sample and pipeline timings
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let status = state.dashboard_service.status();
    Json(status_to_response(status, state.performance_monitor.summary()))
}
