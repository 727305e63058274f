// Performance monitor - rolling timings fed by the TimingHook, plus update cadence
use crate::application::sensor_store::{SensorDataStore, Subscription};
use crate::application::timing::TimingHook;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

const WINDOW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationTiming {
    pub count: u64,
    pub last_ms: f64,
    pub average_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub operations: BTreeMap<String, OperationTiming>,
    pub update_count: u64,
    pub update_frequency_hz: f64,
}

#[derive(Default)]
struct Samples {
    recent: VecDeque<Duration>,
    count: u64,
}

#[derive(Default)]
struct UpdateCadence {
    last: Option<Instant>,
    count: u64,
    frequency_hz: f64,
}

#[derive(Default)]
pub struct PerformanceMonitor {
    operations: Mutex<BTreeMap<String, Samples>>,
    updates: Mutex<UpdateCadence>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the update cadence from `store`. Notifications from failed cycles
    /// carry no new data and are not counted.
    pub fn track_store_updates(self: &Arc<Self>, store: &Arc<SensorDataStore>) -> Subscription {
        let monitor = Arc::clone(self);
        let watched = Arc::downgrade(store);
        store.subscribe(move || {
            let Some(store) = watched.upgrade() else {
                return;
            };
            if store.get_snapshot().is_connected {
                monitor.track_data_update();
            }
        })
    }

    /// Call once per successful data update.
    pub fn track_data_update(&self) {
        self.track_data_update_at(Instant::now());
    }

    fn track_data_update_at(&self, now: Instant) {
        let mut updates = self.updates.lock();
        if let Some(last) = updates.last {
            let since = now.saturating_duration_since(last).as_secs_f64();
            if since > 0.0 {
                updates.frequency_hz = 1.0 / since;
            }
            updates.count += 1;
        }
        updates.last = Some(now);
    }

    pub fn summary(&self) -> PerformanceSummary {
        let operations = self
            .operations
            .lock()
            .iter()
            .map(|(name, samples)| {
                let total: Duration = samples.recent.iter().sum();
                let average = if samples.recent.is_empty() {
                    0.0
                } else {
                    millis(total) / samples.recent.len() as f64
                };
                let timing = OperationTiming {
                    count: samples.count,
                    last_ms: samples.recent.back().copied().map(millis).unwrap_or(0.0),
                    average_ms: average,
                };
                (name.clone(), timing)
            })
            .collect();

        let updates = self.updates.lock();
        PerformanceSummary {
            operations,
            update_count: updates.count,
            update_frequency_hz: updates.frequency_hz,
        }
    }
}

impl TimingHook for PerformanceMonitor {
    fn record(&self, operation: &str, elapsed: Duration) {
        tracing::trace!(operation, elapsed_ms = millis(elapsed), "timing");

        let mut operations = self.operations.lock();
        let samples = operations.entry(operation.to_string()).or_default();
        samples.recent.push_back(elapsed);
        if samples.recent.len() > WINDOW {
            samples.recent.pop_front();
        }
        samples.count += 1;
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::reading_source::{GenerationError, ReadingSource};
    use crate::application::sensor_store::StoreSettings;
    use crate::application::timing::NoopTiming;
    use crate::domain::reading::Reading;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct SwitchSource {
        failing: AtomicBool,
    }

    impl ReadingSource for SwitchSource {
        fn generate(&self, sensor_id: &str) -> Result<Reading, GenerationError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(GenerationError::SensorUnavailable {
                    sensor_id: sensor_id.to_string(),
                    reason: "offline".to_string(),
                });
            }
            Ok(Reading::new(sensor_id.to_string(), Utc::now(), 21.0, 55.0, 40.0))
        }
    }

    #[test]
    fn test_rolling_average_window() {
        let monitor = PerformanceMonitor::new();
        for _ in 0..WINDOW {
            monitor.record("filter_and_sort", Duration::from_millis(10));
        }
        for _ in 0..WINDOW {
            monitor.record("filter_and_sort", Duration::from_millis(2));
        }

        let summary = monitor.summary();
        let timing = summary.operations["filter_and_sort"];
        assert_eq!(timing.count, 200);
        assert!((timing.average_ms - 2.0).abs() < 1e-9);
        assert!((timing.last_ms - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_update_frequency() {
        let monitor = PerformanceMonitor::new();
        let start = Instant::now();

        monitor.track_data_update_at(start);
        assert_eq!(monitor.summary().update_count, 0);

        monitor.track_data_update_at(start + Duration::from_millis(2000));
        let summary = monitor.summary();
        assert_eq!(summary.update_count, 1);
        assert!((summary.update_frequency_hz - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_failed_cycles_are_not_data_updates() {
        let source = Arc::new(SwitchSource::default());
        let store = Arc::new(SensorDataStore::new(
            StoreSettings::default(),
            source.clone(),
            Arc::new(NoopTiming),
        ));
        let monitor = Arc::new(PerformanceMonitor::new());
        let _subscription = monitor.track_store_updates(&store);

        store.run_cycle();
        store.run_cycle();
        assert_eq!(monitor.summary().update_count, 1);

        source.failing.store(true, Ordering::SeqCst);
        store.run_cycle();
        assert_eq!(monitor.summary().update_count, 1);

        source.failing.store(false, Ordering::SeqCst);
        store.run_cycle();
        assert_eq!(monitor.summary().update_count, 2);
    }
}
