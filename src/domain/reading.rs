// Sensor reading domain model
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;

/// One timestamped measurement triple from a simulated sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub sensor_id: String,
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub air_quality: f64,
}

impl Reading {
    pub fn new(
        sensor_id: String,
        timestamp: DateTime<Utc>,
        temperature: f64,
        humidity: f64,
        air_quality: f64,
    ) -> Self {
        Self {
            sensor_id,
            timestamp,
            temperature,
            humidity,
            air_quality,
        }
    }

    pub fn air_quality_level(&self) -> AirQualityLevel {
        AirQualityLevel::classify(self.air_quality)
    }
}

/// Fields a reading can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadingField {
    SensorId,
    Timestamp,
    Temperature,
    Humidity,
    AirQuality,
}

impl ReadingField {
    /// Numeric value of the field, `None` for non-numeric fields.
    pub fn numeric_value(&self, reading: &Reading) -> Option<f64> {
        match self {
            ReadingField::Temperature => Some(reading.temperature),
            ReadingField::Humidity => Some(reading.humidity),
            ReadingField::AirQuality => Some(reading.air_quality),
            ReadingField::SensorId | ReadingField::Timestamp => None,
        }
    }
}

impl FromStr for ReadingField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sensorId" | "sensor_id" => Ok(ReadingField::SensorId),
            "timestamp" => Ok(ReadingField::Timestamp),
            "temperature" => Ok(ReadingField::Temperature),
            "humidity" => Ok(ReadingField::Humidity),
            "airQuality" | "air_quality" => Ok(ReadingField::AirQuality),
            other => Err(format!("unknown reading field: {}", other)),
        }
    }
}

/// AQI bands used when presenting a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AirQualityLevel {
    Good,
    Moderate,
    UnhealthyForSensitive,
    Unhealthy,
    VeryUnhealthy,
}

impl AirQualityLevel {
    pub fn classify(aqi: f64) -> Self {
        if aqi <= 50.0 {
            AirQualityLevel::Good
        } else if aqi <= 100.0 {
            AirQualityLevel::Moderate
        } else if aqi <= 150.0 {
            AirQualityLevel::UnhealthyForSensitive
        } else if aqi <= 200.0 {
            AirQualityLevel::Unhealthy
        } else {
            AirQualityLevel::VeryUnhealthy
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AirQualityLevel::Good => "Good",
            AirQualityLevel::Moderate => "Moderate",
            AirQualityLevel::UnhealthyForSensitive => "Unhealthy for Sensitive",
            AirQualityLevel::Unhealthy => "Unhealthy",
            AirQualityLevel::VeryUnhealthy => "Very Unhealthy",
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            AirQualityLevel::Good => "aqi-good",
            AirQualityLevel::Moderate => "aqi-moderate",
            AirQualityLevel::UnhealthyForSensitive => "aqi-sensitive",
            AirQualityLevel::Unhealthy => "aqi-unhealthy",
            AirQualityLevel::VeryUnhealthy => "aqi-very-unhealthy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_air_quality_bands() {
        assert_eq!(AirQualityLevel::classify(0.0), AirQualityLevel::Good);
        assert_eq!(AirQualityLevel::classify(50.0), AirQualityLevel::Good);
        assert_eq!(AirQualityLevel::classify(50.01), AirQualityLevel::Moderate);
        assert_eq!(
            AirQualityLevel::classify(150.0),
            AirQualityLevel::UnhealthyForSensitive
        );
        assert_eq!(AirQualityLevel::classify(199.99), AirQualityLevel::Unhealthy);
        assert_eq!(AirQualityLevel::classify(250.0), AirQualityLevel::VeryUnhealthy);
        assert_eq!(AirQualityLevel::Moderate.class_name(), "aqi-moderate");
    }

    #[test]
    fn test_parse_field_names() {
        assert_eq!("airQuality".parse::<ReadingField>(), Ok(ReadingField::AirQuality));
        assert_eq!("sensor_id".parse::<ReadingField>(), Ok(ReadingField::SensorId));
        assert!("pressure".parse::<ReadingField>().is_err());
    }
}
