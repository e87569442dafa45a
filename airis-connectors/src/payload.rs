//! Datastore payload
//!
//! The flat JSON row the `sensor_data` table expects. Missing measurements
//! are sent as `null`; the row is never padded with zeros.

use airis_core::{AlertLevel, CompositeRecord, SensorType};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One `sensor_data` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPayload {
    /// Random row identifier
    pub id: Uuid,
    /// When the readings were taken
    pub timestamp: DateTime<Utc>,
    /// Reporting device
    pub device_id: String,
    /// CO2 (ppm)
    pub co2: Option<f32>,
    /// PM2.5 (mg/m³)
    pub pm25: Option<f32>,
    /// CO (ppm)
    pub co: Option<f32>,
    /// Temperature (°C)
    pub temperature: Option<f32>,
    /// Relative humidity (%)
    pub humidity: Option<f32>,
    /// When the row was built
    pub created_at: DateTime<Utc>,
    /// Worst alert tier across the readings
    pub alert_level: AlertLevel,
    /// Installation location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl TelemetryPayload {
    /// Build a row from a record
    pub fn from_record(record: &CompositeRecord, location: Option<&str>) -> Self {
        let created_at = Utc::now();
        let timestamp = Utc
            .timestamp_millis_opt(record.timestamp() as i64)
            .single()
            .unwrap_or(created_at);

        Self {
            id: Uuid::new_v4(),
            timestamp,
            device_id: record.device_id().to_string(),
            co2: record.value(SensorType::Co2),
            pm25: record.value(SensorType::Pm25),
            co: record.value(SensorType::Co),
            temperature: record.value(SensorType::Temperature),
            humidity: record.value(SensorType::Humidity),
            created_at,
            alert_level: record.worst_alert(),
            location: location.map(str::to_string),
        }
    }

    /// Value of one measurement
    pub fn value(&self, sensor_type: SensorType) -> Option<f32> {
        match sensor_type {
            SensorType::Co2 => self.co2,
            SensorType::Pm25 => self.pm25,
            SensorType::Co => self.co,
            SensorType::Temperature => self.temperature,
            SensorType::Humidity => self.humidity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use airis_core::{record::device_id, record::RecordBuilder, CalibratedReading};

    fn record() -> CompositeRecord {
        let mut builder = RecordBuilder::new();
        builder
            .push(CalibratedReading::new(SensorType::Co2, 850.0), AlertLevel::Normal)
            .push(CalibratedReading::new(SensorType::Pm25, 0.12), AlertLevel::Normal)
            .push(CalibratedReading::new(SensorType::Temperature, 36.5), AlertLevel::Warning);
        builder.finish(device_id("AIRIS_OFFICE_01").unwrap(), 1_700_000_000_123)
    }

    #[test]
    fn row_shape() {
        let payload = TelemetryPayload::from_record(&record(), Some("Conference Room"));
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["device_id"], "AIRIS_OFFICE_01");
        assert_eq!(json["co2"], 850.0);
        assert!(json["co"].is_null());
        assert!(json["humidity"].is_null());
        assert_eq!(json["alert_level"], "warning");
        assert_eq!(json["location"], "Conference Room");
        assert_eq!(json["timestamp"], "2023-11-14T22:13:20.123Z");
        assert_eq!(json["id"].as_str().map(str::len), Some(36));
    }

    #[test]
    fn location_omitted_when_unset() {
        let payload = TelemetryPayload::from_record(&record(), None);
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("location").is_none());
    }

    #[test]
    fn ids_are_unique() {
        let a = TelemetryPayload::from_record(&record(), None);
        let b = TelemetryPayload::from_record(&record(), None);
        assert_ne!(a.id, b.id);
        assert_eq!(a.value(SensorType::Temperature), Some(36.5));
    }
}
