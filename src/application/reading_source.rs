// Reading source trait - where readings come from
use crate::domain::reading::Reading;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("sensor {sensor_id} unavailable: {reason}")]
    SensorUnavailable { sensor_id: String, reason: String },
    #[error("reading source panicked while generating for {sensor_id}")]
    SourcePanicked { sensor_id: String },
}

pub trait ReadingSource: Send + Sync {
    /// Produce one reading for the given sensor, stamped with the current time
    fn generate(&self, sensor_id: &str) -> Result<Reading, GenerationError>;
}
