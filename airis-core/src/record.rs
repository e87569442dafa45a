//! Composite records
//!
//! One record per successful cycle: every measurement taken in that cycle,
//! the alert tier of each, the device identity and a single timestamp.
//! Records are assembled by [`RecordBuilder`] and read-only afterwards.

use heapless::{LinearMap, String};

use crate::{
    calibration::CalibratedReading,
    constants::buffers::{MAX_DEVICE_ID_LEN, MAX_SENSOR_TYPES},
    errors::SetupError,
    sensors::SensorType,
    time::Timestamp,
    validators::AlertLevel,
};

/// Device identifier stored inline in every record
pub type DeviceId = String<MAX_DEVICE_ID_LEN>;

/// Build a [`DeviceId`], rejecting identifiers that do not fit
pub fn device_id(id: &str) -> Result<DeviceId, SetupError> {
    let mut buf = DeviceId::new();
    buf.push_str(id)
        .map_err(|_| SetupError::DeviceIdTooLong { max: MAX_DEVICE_ID_LEN })?;
    Ok(buf)
}

/// All readings of one acquisition cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeRecord {
    device_id: DeviceId,
    timestamp: Timestamp,
    readings: LinearMap<SensorType, CalibratedReading, MAX_SENSOR_TYPES>,
    alerts: LinearMap<SensorType, AlertLevel, MAX_SENSOR_TYPES>,
}

impl CompositeRecord {
    /// Device that produced the record
    pub fn device_id(&self) -> &str {
        self.device_id.as_str()
    }

    /// Assembly time (milliseconds since epoch)
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Reading of one measurement, if it was taken
    pub fn reading(&self, sensor_type: SensorType) -> Option<&CalibratedReading> {
        self.readings.get(&sensor_type)
    }

    /// Value of one measurement, if it was taken
    pub fn value(&self, sensor_type: SensorType) -> Option<f32> {
        self.reading(sensor_type).map(|r| r.value)
    }

    /// Alert tier of one measurement, if it was taken
    pub fn alert(&self, sensor_type: SensorType) -> Option<AlertLevel> {
        self.alerts.get(&sensor_type).copied()
    }

    /// Every reading, in insertion order
    pub fn readings(&self) -> impl Iterator<Item = &CalibratedReading> {
        self.readings.values()
    }

    /// Every alert tier, in insertion order
    pub fn alerts(&self) -> impl Iterator<Item = (SensorType, AlertLevel)> + '_ {
        self.alerts.iter().map(|(t, l)| (*t, *l))
    }

    /// Highest alert tier in the record, `Normal` for an empty record
    pub fn worst_alert(&self) -> AlertLevel {
        self.alerts.values().copied().max().unwrap_or_default()
    }

    /// Number of measurements
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether the record holds no measurement
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Incremental assembly of a [`CompositeRecord`]
#[derive(Debug, Default)]
pub struct RecordBuilder {
    readings: LinearMap<SensorType, CalibratedReading, MAX_SENSOR_TYPES>,
    alerts: LinearMap<SensorType, AlertLevel, MAX_SENSOR_TYPES>,
}

impl RecordBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one measurement
    ///
    /// The table holds one entry per [`SensorType`], so it never overflows.
    pub fn push(&mut self, reading: CalibratedReading, level: AlertLevel) -> &mut Self {
        // Capacity >= number of sensor types
        let _ = self.readings.insert(reading.sensor_type, reading);
        let _ = self.alerts.insert(reading.sensor_type, level);
        self
    }

    /// Seal the record
    pub fn finish(self, device_id: DeviceId, timestamp: Timestamp) -> CompositeRecord {
        CompositeRecord {
            device_id,
            timestamp,
            readings: self.readings,
            alerts: self.alerts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worst_alert_is_maximum() {
        let mut builder = RecordBuilder::new();
        builder
            .push(CalibratedReading::new(SensorType::Co, 12.0), AlertLevel::Normal)
            .push(CalibratedReading::new(SensorType::Temperature, 37.0), AlertLevel::Warning)
            .push(CalibratedReading::new(SensorType::Humidity, 50.0), AlertLevel::Normal);
        let record = builder.finish(device_id("esp32-01").unwrap(), 1_000);

        assert_eq!(record.worst_alert(), AlertLevel::Warning);
        assert_eq!(record.value(SensorType::Temperature), Some(37.0));
        assert_eq!(record.alert(SensorType::Co), Some(AlertLevel::Normal));
        assert_eq!(record.value(SensorType::Pm25), None);
        assert_eq!(record.len(), 3);
        assert_eq!(record.device_id(), "esp32-01");
    }

    #[test]
    fn empty_record_is_normal() {
        let record = RecordBuilder::new().finish(DeviceId::new(), 0);
        assert!(record.is_empty());
        assert_eq!(record.worst_alert(), AlertLevel::Normal);
    }

    #[test]
    fn long_device_id_rejected() {
        let id = "x".repeat(MAX_DEVICE_ID_LEN + 1);
        assert_eq!(
            device_id(&id),
            Err(SetupError::DeviceIdTooLong { max: MAX_DEVICE_ID_LEN })
        );
    }
}
