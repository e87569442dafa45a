//! Climate sensor (DHT22)

use super::finite;
use crate::{
    errors::{CalibrationError, CalibrationResult},
    sensors::{SensorKind, SensorType},
    traits::ClimateSample,
};

/// Pick the requested value out of a sensor frame
///
/// The sensor reports physical units already; a NaN or infinite field is a
/// calibration error, not something to clamp.
pub fn climate_value(frame: &ClimateSample, sensor_type: SensorType) -> CalibrationResult<f32> {
    match sensor_type {
        SensorType::Temperature => finite(frame.temperature, "temperature"),
        SensorType::Humidity => finite(frame.humidity, "humidity"),
        _ => Err(CalibrationError::Unsupported {
            kind: SensorKind::Dht22,
            sensor_type,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_is_rejected() {
        let frame = ClimateSample { temperature: f32::NAN, humidity: 55.0 };

        assert!(climate_value(&frame, SensorType::Temperature).is_err());
        assert_eq!(climate_value(&frame, SensorType::Humidity), Ok(55.0));
    }

    #[test]
    fn gas_types_unsupported() {
        let frame = ClimateSample { temperature: 20.0, humidity: 40.0 };
        assert!(matches!(
            climate_value(&frame, SensorType::Co),
            Err(CalibrationError::Unsupported { .. })
        ));
    }
}
