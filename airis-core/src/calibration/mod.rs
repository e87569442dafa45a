//! Calibration Engine
//!
//! ## Overview
//!
//! Turns a raw sample into a physical-unit value. Every transfer function is a
//! pure function of the sample and a [`CalibrationParameters`] set, and every
//! one returns `Result`: a degenerate sample is a [`CalibrationError`], never a
//! silent zero.
//!
//! ## Transfer Functions
//!
//! ### Resistive gas sensors (MQ-7, MQ-135)
//!
//! ```text
//! V       = raw × Vres / (2^bits − 1)
//! MQ-7    Rs = (Vres − V) / V          ratio = Rs / R0
//!         ppm = A × ratio^B
//! MQ-135  ratio = Vres / V − 1
//!         ppm = A × (ratio / RCA)^B + 400
//! ```
//!
//! The two families use different ratio formulas. They come from distinct
//! manufacturer fits and are kept separate.
//!
//! ### Optical dust sensor (GP2Y1014AU)
//!
//! ```text
//! V       = raw × Vref / (2^bits − 1)
//! density = max(0, 0.17 × V − 0.1)     mg/m³
//! ```
//!
//! Below roughly 0.6 V the linear fit goes negative; that is clamped to zero,
//! not reported as an error.
//!
//! ### Climate sensor (DHT22)
//!
//! The sensor reports physical values directly. Only finiteness is checked.
//!
//! ## Usage
//!
//! ```rust
//! use airis_core::calibration::{calibrate, CalibrationParameters, RawSample};
//! use airis_core::sensors::{SensorKind, SensorType};
//!
//! let params = CalibrationParameters::gp2y1014();
//! let reading = calibrate(SensorKind::Gp2y1014, SensorType::Pm25, RawSample::Analog(0), &params)?;
//! assert_eq!(reading.value, 0.0);
//! # Ok::<(), airis_core::errors::CalibrationError>(())
//! ```

mod climate;
mod particulate;
mod resistive;

pub use climate::climate_value;
pub use particulate::{dust_density, sample_with_led_pulse};
pub use resistive::{co2_ppm, co_ppm, estimate_r0, sensor_resistance};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    constants::sensors::{
        ADC_BIT_RESOLUTION, DUST_VREF_V, MQ135_A, MQ135_B, MQ135_RATIO_CLEAN_AIR, MQ7_A, MQ7_B,
        MQ7_RATIO_CLEAN_AIR, MQ_SUPPLY_V,
    },
    errors::{CalibrationError, CalibrationResult},
    sensors::{SensorKind, SensorType, Unit},
    traits::ClimateSample,
};

/// Per-sensor constants of a transfer function
///
/// Fixed after start-up. `r0` is either configured or measured once by
/// [`estimate_r0`] during warm-up and then held for the session.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationParameters {
    /// Regression coefficient
    pub a: f32,
    /// Regression exponent
    pub b: f32,
    /// Rs/R0 in clean air
    pub ratio_clean_air: f32,
    /// Full-scale voltage of the analog path (V)
    pub voltage_resolution: f32,
    /// ADC resolution (bits)
    pub adc_bit_resolution: u8,
    /// Clean-air baseline resistance, when the sensor needs one
    #[cfg_attr(feature = "serde", serde(default))]
    pub r0: Option<f32>,
}

impl CalibrationParameters {
    /// MQ-7 carbon monoxide fit, 5 V / 12-bit, R0 measured at start-up
    pub fn mq7() -> Self {
        Self {
            a: MQ7_A,
            b: MQ7_B,
            ratio_clean_air: MQ7_RATIO_CLEAN_AIR,
            voltage_resolution: MQ_SUPPLY_V,
            adc_bit_resolution: ADC_BIT_RESOLUTION,
            r0: None,
        }
    }

    /// MQ-135 CO2 fit, 5 V / 12-bit
    pub fn mq135() -> Self {
        Self {
            a: MQ135_A,
            b: MQ135_B,
            ratio_clean_air: MQ135_RATIO_CLEAN_AIR,
            voltage_resolution: MQ_SUPPLY_V,
            adc_bit_resolution: ADC_BIT_RESOLUTION,
            r0: None,
        }
    }

    /// GP2Y1014AU divider, 3.3 V / 12-bit (regression fields unused)
    pub fn gp2y1014() -> Self {
        Self {
            a: 0.0,
            b: 0.0,
            ratio_clean_air: 1.0,
            voltage_resolution: DUST_VREF_V,
            adc_bit_resolution: ADC_BIT_RESOLUTION,
            r0: None,
        }
    }

    /// DHT22 has no transfer function; all fields are placeholders
    pub fn dht22() -> Self {
        Self {
            a: 0.0,
            b: 0.0,
            ratio_clean_air: 1.0,
            voltage_resolution: 0.0,
            adc_bit_resolution: 0,
            r0: None,
        }
    }

    /// Factory defaults for a sensor kind
    pub fn defaults_for(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Mq7 => Self::mq7(),
            SensorKind::Mq135 => Self::mq135(),
            SensorKind::Gp2y1014 => Self::gp2y1014(),
            SensorKind::Dht22 => Self::dht22(),
        }
    }

    /// Same parameters with a fixed baseline
    pub fn with_r0(mut self, r0: f32) -> Self {
        self.r0 = Some(r0);
        self
    }

    /// Full-scale ADC count, `2^bits − 1`
    pub fn adc_max(&self) -> CalibrationResult<u16> {
        match self.adc_bit_resolution {
            1..=16 => Ok(((1u32 << self.adc_bit_resolution) - 1) as u16),
            _ => Err(CalibrationError::MissingParameter { name: "adc_bit_resolution" }),
        }
    }

    /// Convert a raw count to volts
    pub fn voltage(&self, raw: u16) -> CalibrationResult<f32> {
        let max = self.adc_max()?;
        if raw > max {
            return Err(CalibrationError::OutOfDomain { raw, max });
        }
        if !(self.voltage_resolution.is_finite() && self.voltage_resolution > 0.0) {
            return Err(CalibrationError::MissingParameter { name: "voltage_resolution" });
        }
        Ok(raw as f32 * self.voltage_resolution / max as f32)
    }
}

/// Sample as delivered by the bus
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawSample {
    /// ADC count
    Analog(u16),
    /// Climate sensor frame
    Climate(ClimateSample),
}

/// Physical-unit value derived from one raw sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibratedReading {
    /// Measurement
    pub sensor_type: SensorType,
    /// Value in `unit`, always finite
    pub value: f32,
    /// Unit of `value`
    pub unit: Unit,
}

impl CalibratedReading {
    /// Reading in the canonical unit of `sensor_type`
    pub fn new(sensor_type: SensorType, value: f32) -> Self {
        Self {
            sensor_type,
            value,
            unit: sensor_type.unit(),
        }
    }
}

/// Calibrate one raw sample into the requested measurement
///
/// `sensor_type` must be one of `kind.produces()`, and the sample shape must
/// match the sensor (analog count for MQ/GP2Y, climate frame for DHT22).
pub fn calibrate(
    kind: SensorKind,
    sensor_type: SensorType,
    sample: RawSample,
    params: &CalibrationParameters,
) -> CalibrationResult<CalibratedReading> {
    let value = match (kind, sensor_type, sample) {
        (SensorKind::Mq7, SensorType::Co, RawSample::Analog(raw)) => co_ppm(raw, params)?,
        (SensorKind::Mq135, SensorType::Co2, RawSample::Analog(raw)) => co2_ppm(raw, params)?,
        (SensorKind::Gp2y1014, SensorType::Pm25, RawSample::Analog(raw)) => {
            dust_density(raw, params)?
        }
        (SensorKind::Dht22, SensorType::Temperature | SensorType::Humidity, RawSample::Climate(frame)) => {
            climate_value(&frame, sensor_type)?
        }
        _ => return Err(CalibrationError::Unsupported { kind, sensor_type }),
    };

    Ok(CalibratedReading::new(sensor_type, value))
}

/// Reject NaN and infinity coming out of a computation step
pub(crate) fn finite(value: f32, stage: &'static str) -> CalibrationResult<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(CalibrationError::NonFinite { stage })
    }
}
