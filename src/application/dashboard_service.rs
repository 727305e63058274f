// Dashboard service - derives the visible view from the store's current snapshot
use crate::application::query_pipeline::{compute_statistics, filter_and_sort, paginate};
use crate::application::sensor_store::SensorDataStore;
use crate::application::timing::{measure, TimingHook, OP_FILTER_AND_SORT, OP_PAGINATE, OP_STATISTICS};
use crate::domain::query::{FilterState, PageInfo, PageRequest, SortConfig, Statistics};
use crate::domain::reading::Reading;
use crate::domain::snapshot::Snapshot;
use parking_lot::Mutex;
use std::sync::Arc;

const STATUS_SAMPLE_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardQuery {
    pub filters: FilterState,
    pub sort: SortConfig,
    pub page: PageRequest,
}

#[derive(Debug, Clone)]
pub struct DashboardView {
    pub readings: Vec<Reading>,
    pub page: PageInfo,
    pub statistics: Option<Statistics>,
    pub total_readings: usize,
    pub is_connected: bool,
    pub error: Option<String>,
    pub filters: FilterState,
    pub sort: SortConfig,
}

#[derive(Debug, Clone)]
pub struct StoreStatus {
    pub reading_count: usize,
    pub is_connected: bool,
    pub error: Option<String>,
    pub sample: Vec<Reading>,
    pub subscriber_count: usize,
}

/// Last derivation, reused while the snapshot reference and the query inputs
/// stay the same.
struct Derived {
    snapshot: Arc<Snapshot>,
    filters: FilterState,
    sort: SortConfig,
    visible: Arc<[Reading]>,
    statistics: Option<Statistics>,
}

pub struct DashboardService {
    store: Arc<SensorDataStore>,
    timing: Arc<dyn TimingHook>,
    last: Mutex<Option<Derived>>,
}

impl DashboardService {
    pub fn new(store: Arc<SensorDataStore>, timing: Arc<dyn TimingHook>) -> Self {
        Self {
            store,
            timing,
            last: Mutex::new(None),
        }
    }

    pub fn build_view(&self, query: &DashboardQuery) -> DashboardView {
        let snapshot = self.store.get_snapshot();
        let (visible, statistics) = self.derive(&snapshot, query);

        let mut page = measure(self.timing.as_ref(), OP_PAGINATE, || paginate(&visible, query.page));
        let requested = query.page.page_number();
        if requested > 1 && requested > page.info.total_pages {
            tracing::debug!(
                "Page {} is past the last page ({}), showing page 1",
                requested,
                page.info.total_pages
            );
            page = paginate(&visible, query.page.first_page());
        }

        DashboardView {
            readings: page.items,
            page: page.info,
            statistics,
            total_readings: snapshot.len(),
            is_connected: snapshot.is_connected,
            error: snapshot.error.clone(),
            filters: query.filters,
            sort: query.sort,
        }
    }

    pub fn status(&self) -> StoreStatus {
        let snapshot = self.store.get_snapshot();
        StoreStatus {
            reading_count: snapshot.len(),
            is_connected: snapshot.is_connected,
            error: snapshot.error.clone(),
            sample: snapshot.data.iter().take(STATUS_SAMPLE_SIZE).cloned().collect(),
            subscriber_count: self.store.listener_count(),
        }
    }

    fn derive(&self, snapshot: &Arc<Snapshot>, query: &DashboardQuery) -> (Arc<[Reading]>, Option<Statistics>) {
        if snapshot.is_empty() {
            return (Arc::from(Vec::new()), None);
        }

        let mut last = self.last.lock();

        if let Some(derived) = last.as_ref() {
            if Arc::ptr_eq(&derived.snapshot, snapshot)
                && derived.filters == query.filters
                && derived.sort == query.sort
            {
                return (Arc::clone(&derived.visible), derived.statistics);
            }
        }

        let visible: Arc<[Reading]> = measure(self.timing.as_ref(), OP_FILTER_AND_SORT, || {
            filter_and_sort(&snapshot.data, &query.filters, &query.sort)
        })
        .into();
        let statistics = measure(self.timing.as_ref(), OP_STATISTICS, || compute_statistics(&visible));

        *last = Some(Derived {
            snapshot: Arc::clone(snapshot),
            filters: query.filters,
            sort: query.sort,
            visible: Arc::clone(&visible),
            statistics,
        });

        (visible, statistics)
    }
}
