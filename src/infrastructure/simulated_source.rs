// Simulated sensor source - synthetic readings in plausible greenhouse ranges
use crate::application::reading_source::{GenerationError, ReadingSource};
use crate::domain::reading::Reading;
use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const TEMPERATURE_RANGE: (f64, f64) = (10.0, 40.0);
const HUMIDITY_RANGE: (f64, f64) = (30.0, 90.0);
const AIR_QUALITY_RANGE: (f64, f64) = (0.0, 200.0);

pub struct SimulatedSensorSource {
    rng: Mutex<StdRng>,
    fault_rate: f64,
}

impl SimulatedSensorSource {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Reproducible sequence of values, timestamps still come from the clock
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            fault_rate: 0.0,
        }
    }

    /// Make each generated reading fail with the given probability.
    pub fn with_fault_rate(mut self, fault_rate: f64) -> Self {
        self.fault_rate = fault_rate.clamp(0.0, 1.0);
        self
    }
}

impl Default for SimulatedSensorSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingSource for SimulatedSensorSource {
    fn generate(&self, sensor_id: &str) -> Result<Reading, GenerationError> {
        let mut rng = self.rng.lock();

        if self.fault_rate > 0.0 && rng.random_bool(self.fault_rate) {
            return Err(GenerationError::SensorUnavailable {
                sensor_id: sensor_id.to_string(),
                reason: "no response from sensor".to_string(),
            });
        }

        let temperature = sample(&mut *rng, TEMPERATURE_RANGE);
        let humidity = sample(&mut *rng, HUMIDITY_RANGE);
        let air_quality = sample(&mut *rng, AIR_QUALITY_RANGE);

        Ok(Reading::new(
            sensor_id.to_string(),
            Utc::now(),
            temperature,
            humidity,
            air_quality,
        ))
    }
}

/// Uniform value in `[lo, hi)`, rounded to two decimals.
fn sample(rng: &mut impl Rng, (lo, hi): (f64, f64)) -> f64 {
    let value = rng.random_range(lo..hi);
    ((value * 100.0).round() / 100.0).clamp(lo, hi)
}
