// Elapsed-time hook consumed around production and pipeline steps
use std::time::{Duration, Instant};

pub const OP_PRODUCTION: &str = "production";
pub const OP_FILTER_AND_SORT: &str = "filter_and_sort";
pub const OP_STATISTICS: &str = "statistics";
pub const OP_PAGINATE: &str = "paginate";

pub trait TimingHook: Send + Sync {
    fn record(&self, operation: &str, elapsed: Duration);
}

/// Default hook, records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTiming;

impl TimingHook for NoopTiming {
    fn record(&self, _operation: &str, _elapsed: Duration) {}
}

/// Run `f` and report how long it took under `operation`.
pub fn measure<T>(hook: &dyn TimingHook, operation: &str, f: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let result = f();
    hook.record(operation, started.elapsed());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl TimingHook for Recorder {
        fn record(&self, operation: &str, _elapsed: Duration) {
            self.seen.lock().push(operation.to_string());
        }
    }

    #[test]
    fn test_measure_records_and_returns() {
        let recorder = Recorder::default();
        let value = measure(&recorder, OP_STATISTICS, || 21 * 2);

        assert_eq!(value, 42);
        assert_eq!(*recorder.seen.lock(), vec![OP_STATISTICS.to_string()]);
    }

    #[test]
    fn test_noop_measure() {
        assert_eq!(measure(&NoopTiming, OP_PAGINATE, || "done"), "done");
    }
}
