//! Calibration Sets
//!
//! Factory coefficients for every supported device, with optional per-batch
//! corrections. Field names follow the firmware configuration: `slope` is the
//! regression coefficient `A`, `intercept` the exponent `B` and `r0` the
//! clean-air resistance ratio.

use std::collections::BTreeMap;

use airis_core::{CalibrationParameters, SensorKind};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::SchemaError;

/// Partial coefficients for one device
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOverride {
    /// Regression coefficient `A`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slope: Option<f32>,
    /// Regression exponent `B`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intercept: Option<f32>,
    /// Clean-air resistance ratio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r0: Option<f32>,
    /// Full-scale voltage of the analog path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage_resolution: Option<f32>,
    /// ADC resolution in bits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adc_bit_resolution: Option<u8>,
    /// Fixed baseline resistance; skips the start-up warm-up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_r0: Option<f32>,
}

impl CalibrationOverride {
    fn apply(&self, params: &mut CalibrationParameters) {
        if let Some(a) = self.slope {
            params.a = a;
        }
        if let Some(b) = self.intercept {
            params.b = b;
        }
        if let Some(ratio) = self.r0 {
            params.ratio_clean_air = ratio;
        }
        if let Some(volts) = self.voltage_resolution {
            params.voltage_resolution = volts;
        }
        if let Some(bits) = self.adc_bit_resolution {
            params.adc_bit_resolution = bits;
        }
        if let Some(r0) = self.baseline_r0 {
            params.r0 = Some(r0);
        }
    }
}

lazy_static! {
    /// Corrections measured for specific sensor production batches
    static ref BATCHES: BTreeMap<&'static str, (SensorKind, CalibrationOverride)> = {
        let mut batches = BTreeMap::new();
        batches.insert(
            "mq7_sensor_batch_1",
            (
                SensorKind::Mq7,
                CalibrationOverride {
                    slope: Some(100.042),
                    intercept: Some(-1.618),
                    r0: Some(27.0),
                    ..Default::default()
                },
            ),
        );
        batches.insert(
            "mq135_sensor_batch_2",
            (
                SensorKind::Mq135,
                CalibrationOverride {
                    slope: Some(112.47),
                    intercept: Some(-2.962),
                    r0: Some(3.5),
                    ..Default::default()
                },
            ),
        );
        batches
    };
}

/// Names of the known calibration batches
pub fn batch_names() -> impl Iterator<Item = &'static str> {
    BATCHES.keys().copied()
}

/// Coefficients for every supported device
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSet {
    params: [CalibrationParameters; SensorKind::ALL.len()],
}

impl CalibrationSet {
    /// Factory coefficients
    pub fn factory() -> Self {
        Self {
            params: SensorKind::ALL.map(CalibrationParameters::defaults_for),
        }
    }

    /// Factory coefficients patched by a JSON document keyed by device name
    ///
    /// ```json
    /// { "mq7": { "slope": 99.042, "intercept": -1.518, "r0": 27.5 } }
    /// ```
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let raw: BTreeMap<String, CalibrationOverride> = serde_json::from_str(json)?;

        let mut set = Self::factory();
        for (name, patch) in raw {
            let kind = SensorKind::from_name(&name)
                .ok_or_else(|| SchemaError::UnknownSensorKind(name.clone()))?;
            set.apply(kind, &patch)?;
        }
        Ok(set)
    }

    /// Parameters of one device
    pub fn get(&self, kind: SensorKind) -> CalibrationParameters {
        self.params[index(kind)]
    }

    /// Patch one device's coefficients and re-validate them
    pub fn apply(&mut self, kind: SensorKind, patch: &CalibrationOverride) -> Result<(), SchemaError> {
        let mut params = self.get(kind);
        patch.apply(&mut params);
        validate(kind, &params)?;
        self.params[index(kind)] = params;
        Ok(())
    }

    /// Apply a named production-batch correction
    pub fn with_batch(mut self, name: &str) -> Result<Self, SchemaError> {
        let (kind, patch) = BATCHES
            .get(name)
            .ok_or_else(|| SchemaError::NotFound(format!("calibration batch {}", name)))?;
        self.apply(*kind, patch)?;
        log::info!("Applied calibration batch {} to {}", name, kind);
        Ok(self)
    }
}

impl Default for CalibrationSet {
    fn default() -> Self {
        Self::factory()
    }
}

fn index(kind: SensorKind) -> usize {
    match kind {
        SensorKind::Mq7 => 0,
        SensorKind::Mq135 => 1,
        SensorKind::Gp2y1014 => 2,
        SensorKind::Dht22 => 3,
    }
}

fn validate(kind: SensorKind, params: &CalibrationParameters) -> Result<(), SchemaError> {
    let invalid = |reason| SchemaError::InvalidCalibration { kind, reason };

    if matches!(kind, SensorKind::Dht22) {
        return Ok(());
    }
    if params.adc_max().is_err() {
        return Err(invalid("adc_bit_resolution must be 1..=16"));
    }
    if !(params.voltage_resolution.is_finite() && params.voltage_resolution > 0.0) {
        return Err(invalid("voltage_resolution must be positive"));
    }
    if matches!(kind, SensorKind::Mq7 | SensorKind::Mq135) {
        if !(params.a.is_finite() && params.b.is_finite()) {
            return Err(invalid("slope and intercept must be finite"));
        }
        if !(params.ratio_clean_air.is_finite() && params.ratio_clean_air > 0.0) {
            return Err(invalid("r0 must be positive"));
        }
    }
    match params.r0 {
        Some(r0) if !(r0.is_finite() && r0 > 0.0) => Err(invalid("baseline_r0 must be positive")),
        _ => Ok(()),
    }
}
