// Sensor data store - bounded history, periodic production and change notification
use crate::application::reading_source::{GenerationError, ReadingSource};
use crate::application::timing::{measure, TimingHook, OP_PRODUCTION};
use crate::domain::reading::Reading;
use crate::domain::snapshot::Snapshot;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const MAX_RETAINED: usize = 1000;
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_SENSOR_COUNT: usize = 5;
pub const DEFAULT_SENSOR_PREFIX: &str = "Sensor";

pub const INITIAL_FAILURE_MESSAGE: &str = "Failed to initialize sensor data";
pub const CYCLE_FAILURE_MESSAGE: &str = "Failed to process sensor data update";

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub tick_interval: Duration,
    pub max_retained: usize,
    pub sensor_count: usize,
    pub sensor_prefix: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_retained: MAX_RETAINED,
            sensor_count: DEFAULT_SENSOR_COUNT,
            sensor_prefix: DEFAULT_SENSOR_PREFIX.to_string(),
        }
    }
}

impl StoreSettings {
    /// Sensor identifiers generated on every cycle, e.g. `Sensor-1..Sensor-5`
    pub fn roster(&self) -> Vec<String> {
        (1..=self.sensor_count)
            .map(|i| format!("{}-{}", self.sensor_prefix, i))
            .collect()
    }
}

type Listener = Arc<dyn Fn() + Send + Sync>;

struct StoreState {
    history: Arc<[Reading]>,
    is_connected: bool,
    error: Option<String>,
    cached: Option<Arc<Snapshot>>,
    destroyed: bool,
}

struct StoreInner {
    settings: StoreSettings,
    roster: Vec<String>,
    source: Arc<dyn ReadingSource>,
    timing: Arc<dyn TimingHook>,
    state: Mutex<StoreState>,
    listeners: Mutex<BTreeMap<u64, Listener>>,
    next_listener_id: AtomicU64,
}

impl StoreInner {
    fn generate_batch(&self) -> Result<Vec<Reading>, GenerationError> {
        measure(self.timing.as_ref(), OP_PRODUCTION, || {
            self.roster
                .iter()
                .map(|sensor_id| self.generate_one(sensor_id))
                .collect()
        })
    }

    /// A panicking source counts as a failed reading, not a dead production loop.
    fn generate_one(&self, sensor_id: &str) -> Result<Reading, GenerationError> {
        catch_unwind(AssertUnwindSafe(|| self.source.generate(sensor_id))).unwrap_or_else(|_| {
            Err(GenerationError::SourcePanicked {
                sensor_id: sensor_id.to_string(),
            })
        })
    }

    fn produce_initial(&self) {
        let batch = self.generate_batch();

        let mut state = self.state.lock();
        match batch {
            Ok(readings) => {
                state.history = readings.into_iter().take(self.settings.max_retained).collect();
                state.is_connected = true;
                state.error = None;
                tracing::info!("Initial sensor data generated: {} readings", state.history.len());
            }
            Err(e) => {
                state.is_connected = false;
                state.error = Some(INITIAL_FAILURE_MESSAGE.to_string());
                tracing::error!("Failed to generate initial data: {}", e);
            }
        }
        state.cached = None;
    }

    /// One production attempt. Returns false once the store is destroyed.
    fn run_cycle(&self) -> bool {
        if self.state.lock().destroyed {
            return false;
        }

        let batch = self.generate_batch();

        {
            let mut state = self.state.lock();
            if state.destroyed {
                return false;
            }

            match batch {
                Ok(readings) => {
                    let added = readings.len();
                    let history =
                        prepend_bounded(readings, &state.history, self.settings.max_retained);
                    state.history = history;
                    state.is_connected = true;
                    state.error = None;
                    tracing::debug!(
                        "Sensor data updated: {} new readings, total: {}",
                        added,
                        state.history.len()
                    );
                }
                Err(e) => {
                    // history stays as it was
                    state.is_connected = false;
                    state.error = Some(CYCLE_FAILURE_MESSAGE.to_string());
                    tracing::warn!("Data update error: {}", e);
                }
            }
            state.cached = None;
        }

        self.notify();
        true
    }

    /// Listeners removed by an earlier listener in the same round are skipped.
    fn notify(&self) {
        let ids: Vec<u64> = self.listeners.lock().keys().copied().collect();
        for id in ids {
            let Some(listener) = self.listeners.lock().get(&id).cloned() else {
                continue;
            };
            if catch_unwind(AssertUnwindSafe(|| (*listener)())).is_err() {
                tracing::error!("Store listener panicked during notification");
            }
        }
    }
}

/// Newest batch first, oldest readings dropped past `max_retained`.
fn prepend_bounded(batch: Vec<Reading>, history: &[Reading], max_retained: usize) -> Arc<[Reading]> {
    batch
        .into_iter()
        .chain(history.iter().cloned())
        .take(max_retained)
        .collect()
}

async fn run_production(store: Weak<StoreInner>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = store.upgrade() else {
            break;
        };
        if !inner.run_cycle() {
            break;
        }
    }

    tracing::debug!("Sensor production loop stopped");
}

/// Owns the retained history and drives the periodic production cycle.
pub struct SensorDataStore {
    inner: Arc<StoreInner>,
    production: Mutex<Option<JoinHandle<()>>>,
}

impl SensorDataStore {
    /// Build the store and produce the first batch synchronously, so the first
    /// snapshot is already populated. Nothing is scheduled yet: callers must call
    /// `start` from inside a tokio runtime to begin periodic production.
    pub fn new(
        settings: StoreSettings,
        source: Arc<dyn ReadingSource>,
        timing: Arc<dyn TimingHook>,
    ) -> Self {
        let roster = settings.roster();
        let inner = Arc::new(StoreInner {
            settings,
            roster,
            source,
            timing,
            state: Mutex::new(StoreState {
                history: Arc::from(Vec::new()),
                is_connected: false,
                error: None,
                cached: None,
                destroyed: false,
            }),
            listeners: Mutex::new(BTreeMap::new()),
            next_listener_id: AtomicU64::new(0),
        });

        inner.produce_initial();

        Self {
            inner,
            production: Mutex::new(None),
        }
    }

    /// Spawn the periodic production task. Must be called inside a tokio runtime.
    pub fn start(&self) {
        let mut production = self.production.lock();
        if production.is_some() || self.inner.state.lock().destroyed {
            return;
        }

        let period = self.inner.settings.tick_interval;
        let handle = tokio::spawn(run_production(Arc::downgrade(&self.inner), period));
        *production = Some(handle);

        tracing::info!(
            "Starting sensor data simulation: {} sensors every {:?}",
            self.inner.roster.len(),
            period
        );
    }

    /// Run one production cycle right now, outside the timer.
    pub fn run_cycle(&self) {
        self.inner.run_cycle();
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);

        if !self.inner.state.lock().destroyed {
            self.inner.listeners.lock().insert(id, Arc::new(listener));
        }

        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    pub fn get_snapshot(&self) -> Arc<Snapshot> {
        let mut state = self.inner.state.lock();
        if let Some(snapshot) = &state.cached {
            return Arc::clone(snapshot);
        }

        let snapshot = Arc::new(Snapshot::new(
            Arc::clone(&state.history),
            state.is_connected,
            state.error.clone(),
        ));
        state.cached = Some(Arc::clone(&snapshot));
        snapshot
    }

    /// Stop production and release every listener. The last state stays readable.
    pub fn destroy(&self) {
        if let Some(handle) = self.production.lock().take() {
            handle.abort();
        }

        let was_destroyed = {
            let mut state = self.inner.state.lock();
            let was_destroyed = state.destroyed;
            state.destroyed = true;
            state.cached = None;
            was_destroyed
        };
        self.inner.listeners.lock().clear();

        if !was_destroyed {
            tracing::info!("Sensor data store destroyed");
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

impl Drop for SensorDataStore {
    fn drop(&mut self) {
        self.destroy();
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the listener registered.
pub struct Subscription {
    id: u64,
    store: Weak<StoreInner>,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.store.upgrade() {
            inner.listeners.lock().remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::timing::NoopTiming;
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// Encodes a global sequence number in the temperature field.
    #[derive(Default)]
    struct SequenceSource {
        next: AtomicU64,
        failing: AtomicBool,
        panic_once: AtomicBool,
    }

    impl SequenceSource {
        fn failing() -> Self {
            let source = Self::default();
            source.failing.store(true, Ordering::SeqCst);
            source
        }

        fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn panic_on_next_call(&self) {
            self.panic_once.store(true, Ordering::SeqCst);
        }
    }

    impl ReadingSource for SequenceSource {
        fn generate(&self, sensor_id: &str) -> Result<Reading, GenerationError> {
            if self.panic_once.swap(false, Ordering::SeqCst) {
                panic!("clock fault");
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(GenerationError::SensorUnavailable {
                    sensor_id: sensor_id.to_string(),
                    reason: "simulated fault".to_string(),
                });
            }
            let seq = self.next.fetch_add(1, Ordering::SeqCst);
            Ok(Reading::new(sensor_id.to_string(), Utc::now(), seq as f64, 50.0, 20.0))
        }
    }

    fn store_with(source: Arc<SequenceSource>) -> SensorDataStore {
        SensorDataStore::new(StoreSettings::default(), source, Arc::new(NoopTiming))
    }

    fn sequence_numbers(snapshot: &Snapshot) -> Vec<u64> {
        snapshot.data.iter().map(|r| r.temperature as u64).collect()
    }

    #[test]
    fn test_roster_labels() {
        let settings = StoreSettings {
            sensor_count: 3,
            ..Default::default()
        };
        assert_eq!(settings.roster(), vec!["Sensor-1", "Sensor-2", "Sensor-3"]);
    }

    #[test]
    fn test_initial_batch_is_produced_on_construction() {
        let store = store_with(Arc::new(SequenceSource::default()));
        let snapshot = store.get_snapshot();

        assert_eq!(snapshot.len(), DEFAULT_SENSOR_COUNT);
        assert!(snapshot.is_connected);
        assert_eq!(snapshot.error, None);
        assert_eq!(snapshot.data[0].sensor_id, "Sensor-1");
    }

    #[test]
    fn test_initial_failure_leaves_store_empty() {
        let store = store_with(Arc::new(SequenceSource::failing()));
        let snapshot = store.get_snapshot();

        assert_eq!(snapshot.len(), 0);
        assert!(!snapshot.is_connected);
        assert_eq!(snapshot.error.as_deref(), Some(INITIAL_FAILURE_MESSAGE));
    }

    #[test]
    fn test_history_is_bounded_and_keeps_newest() {
        let store = store_with(Arc::new(SequenceSource::default()));
        for _ in 0..250 {
            store.run_cycle();
            assert!(store.get_snapshot().len() <= MAX_RETAINED);
        }

        // 251 batches of 5 readings: sequence numbers 0..1255
        let snapshot = store.get_snapshot();
        assert_eq!(snapshot.len(), MAX_RETAINED);

        let retained: HashSet<u64> = sequence_numbers(&snapshot).into_iter().collect();
        let expected: HashSet<u64> = (255..1255).collect();
        assert_eq!(retained, expected);

        // newest batch first, roster order inside a batch
        assert_eq!(&sequence_numbers(&snapshot)[..6], &[1250, 1251, 1252, 1253, 1254, 1245]);
    }

    #[test]
    fn test_snapshot_is_reference_stable_between_mutations() {
        let store = store_with(Arc::new(SequenceSource::default()));

        let first = store.get_snapshot();
        let second = store.get_snapshot();
        assert!(Arc::ptr_eq(&first, &second));

        store.run_cycle();
        let third = store.get_snapshot();
        assert!(!Arc::ptr_eq(&second, &third));
        assert!(Arc::ptr_eq(&third, &store.get_snapshot()));
    }

    #[test]
    fn test_failed_cycle_keeps_history_and_recovers() {
        let source = Arc::new(SequenceSource::default());
        let store = store_with(source.clone());
        store.run_cycle();
        let before = store.get_snapshot();

        source.set_failing(true);
        store.run_cycle();
        let failed = store.get_snapshot();

        assert!(!Arc::ptr_eq(&before, &failed));
        assert!(Arc::ptr_eq(&before.data, &failed.data));
        assert!(!failed.is_connected);
        assert_eq!(failed.error.as_deref(), Some(CYCLE_FAILURE_MESSAGE));

        source.set_failing(false);
        store.run_cycle();
        let recovered = store.get_snapshot();

        assert!(recovered.is_connected);
        assert_eq!(recovered.error, None);
        assert_eq!(recovered.len(), 15);
    }

    #[test]
    fn test_listeners_run_once_per_mutation() {
        let source = Arc::new(SequenceSource::default());
        let store = store_with(source.clone());
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));

        let a_count = a.clone();
        let sub_a = store.subscribe(move || {
            a_count.fetch_add(1, Ordering::SeqCst);
        });
        let b_count = b.clone();
        let _sub_b = store.subscribe(move || {
            b_count.fetch_add(1, Ordering::SeqCst);
        });

        store.run_cycle();
        source.set_failing(true);
        store.run_cycle();
        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 2);

        sub_a.unsubscribe();
        sub_a.unsubscribe();
        store.run_cycle();
        assert_eq!(a.load(Ordering::SeqCst), 2);
        assert_eq!(b.load(Ordering::SeqCst), 3);
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn test_listener_can_read_snapshot() {
        let store = Arc::new(store_with(Arc::new(SequenceSource::default())));
        let seen = Arc::new(AtomicUsize::new(0));

        let weak = Arc::downgrade(&store);
        let seen_len = seen.clone();
        let _sub = store.subscribe(move || {
            if let Some(store) = weak.upgrade() {
                seen_len.store(store.get_snapshot().len(), Ordering::SeqCst);
            }
        });

        store.run_cycle();
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let store = store_with(Arc::new(SequenceSource::default()));
        let calls = Arc::new(AtomicUsize::new(0));

        let _bad = store.subscribe(|| panic!("listener failure"));
        let counter = calls.clone();
        let _good = store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.run_cycle();
        store.run_cycle();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.get_snapshot().len(), 15);
    }

    #[test]
    fn test_listener_removed_mid_round_is_skipped() {
        let store = store_with(Arc::new(SequenceSource::default()));
        let later: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let later_calls = Arc::new(AtomicUsize::new(0));

        let to_remove = later.clone();
        let _first = store.subscribe(move || {
            if let Some(subscription) = to_remove.lock().as_ref() {
                subscription.unsubscribe();
            }
        });
        let counter = later_calls.clone();
        *later.lock() = Some(store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        store.run_cycle();
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn test_destroy_freezes_store() {
        let store = store_with(Arc::new(SequenceSource::default()));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let _sub = store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.run_cycle();
        store.destroy();
        store.destroy();
        store.run_cycle();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.listener_count(), 0);

        let frozen = store.get_snapshot();
        assert_eq!(frozen.len(), 10);
        assert!(frozen.is_connected);

        let _late = store.subscribe(|| {});
        assert_eq!(store.listener_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_construction_does_not_schedule_production() {
        let store = store_with(Arc::new(SequenceSource::default()));
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(store.get_snapshot().len(), 5);

        store.start();
        tokio::time::sleep(Duration::from_millis(2_010)).await;
        assert_eq!(store.get_snapshot().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_production() {
        let store = store_with(Arc::new(SequenceSource::default()));
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        let _sub = store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.start();
        store.start();
        tokio::time::sleep(Duration::from_millis(6_010)).await;

        assert_eq!(notified.load(Ordering::SeqCst), 3);
        assert_eq!(store.get_snapshot().len(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_source_fails_cycle_and_production_continues() {
        let source = Arc::new(SequenceSource::default());
        let store = store_with(source.clone());
        let notified = Arc::new(AtomicUsize::new(0));
        let counter = notified.clone();
        let _sub = store.subscribe(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        source.panic_on_next_call();
        store.start();
        tokio::time::sleep(Duration::from_millis(2_010)).await;

        let failed = store.get_snapshot();
        assert_eq!(failed.len(), 5);
        assert!(!failed.is_connected);
        assert_eq!(failed.error.as_deref(), Some(CYCLE_FAILURE_MESSAGE));
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(2_000)).await;

        let recovered = store.get_snapshot();
        assert_eq!(recovered.len(), 10);
        assert!(recovered.is_connected);
        assert_eq!(recovered.error, None);
        assert_eq!(notified.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_source_on_construction_is_initial_failure() {
        let source = Arc::new(SequenceSource::default());
        source.panic_on_next_call();
        let store = store_with(source);
        let snapshot = store.get_snapshot();

        assert!(snapshot.is_empty());
        assert!(!snapshot.is_connected);
        assert_eq!(snapshot.error.as_deref(), Some(INITIAL_FAILURE_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_destroy_stops_production() {
        let store = store_with(Arc::new(SequenceSource::default()));
        store.start();

        tokio::time::sleep(Duration::from_millis(2_010)).await;
        assert_eq!(store.get_snapshot().len(), 10);

        store.destroy();
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(store.get_snapshot().len(), 10);

        store.start();
        tokio::time::sleep(Duration::from_millis(4_000)).await;
        assert_eq!(store.get_snapshot().len(), 10);
    }
}
