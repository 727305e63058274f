// Query domain models - filters, ordering, paging and aggregates
use super::reading::{Reading, ReadingField};
use serde::Serialize;
use thiserror::Error;

/// Calling-convention violations of the query pipeline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("page size must be a positive integer, got {0}")]
    InvalidPageSize(i64),
    #[error("page number must be at least 1, got {0}")]
    InvalidPageNumber(i64),
}

/// Range filters for the three metrics. A bound of exactly 0 means "unbounded".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub humidity_min: f64,
    pub humidity_max: f64,
    pub air_quality_min: f64,
    pub air_quality_max: f64,
}

impl FilterState {
    pub fn matches(&self, reading: &Reading) -> bool {
        within(reading.temperature, self.temperature_min, self.temperature_max)
            && within(reading.humidity, self.humidity_min, self.humidity_max)
            && within(reading.air_quality, self.air_quality_min, self.air_quality_max)
    }

    pub fn is_unbounded(&self) -> bool {
        *self == Self::default()
    }
}

fn within(value: f64, min: f64, max: f64) -> bool {
    (min == 0.0 || value >= min) && (max == 0.0 || value <= max)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortDirection {
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortConfig {
    pub key: Option<ReadingField>,
    pub direction: SortDirection,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            key: Some(ReadingField::Timestamp),
            direction: SortDirection::Descending,
        }
    }
}

impl SortConfig {
    pub fn new(key: Option<ReadingField>, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Column-header behaviour: re-selecting the active descending key flips it to
    /// ascending, anything else starts descending on the chosen key.
    pub fn toggle(&self, key: ReadingField) -> Self {
        let direction = if self.key == Some(key) && self.direction == SortDirection::Descending {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        };
        Self {
            key: Some(key),
            direction,
        }
    }
}

/// A validated, 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page_size: usize,
    page_number: usize,
}

impl PageRequest {
    pub fn new(page_size: i64, page_number: i64) -> Result<Self, QueryError> {
        if page_size <= 0 {
            return Err(QueryError::InvalidPageSize(page_size));
        }
        if page_number < 1 {
            return Err(QueryError::InvalidPageNumber(page_number));
        }
        Ok(Self {
            page_size: page_size as usize,
            page_number: page_number as usize,
        })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_number(&self) -> usize {
        self.page_number
    }

    pub fn first_page(&self) -> Self {
        Self {
            page_size: self.page_size,
            page_number: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page_number: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Reading>,
    pub info: PageInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub count: usize,
    pub temperature: MetricSummary,
    pub humidity: MetricSummary,
    pub air_quality: MetricSummary,
}
