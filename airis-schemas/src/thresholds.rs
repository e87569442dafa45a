//! Threshold Tables
//!
//! Loads, merges and validates the per-measurement clamping ranges and alert
//! bands, then hands them to the classifier as an
//! [`airis_core::ThresholdTable`].

use std::collections::BTreeMap;

use airis_core::{
    validators::{AlertBands, Band, ThresholdSpec, ThresholdTable},
    SensorType,
};
use serde::{Deserialize, Serialize};

use crate::SchemaError;

/// One measurement's thresholds in the firmware JSON shape
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEntry {
    /// Lowest reportable value
    pub min: f32,
    /// Highest reportable value
    pub max: f32,
    /// Scalar or range alert bands
    pub alert_level: AlertBands,
}

impl From<ThresholdSpec> for ThresholdEntry {
    fn from(spec: ThresholdSpec) -> Self {
        Self {
            min: spec.min,
            max: spec.max,
            alert_level: spec.alert,
        }
    }
}

impl From<ThresholdEntry> for ThresholdSpec {
    fn from(entry: ThresholdEntry) -> Self {
        Self {
            min: entry.min,
            max: entry.max,
            alert: entry.alert_level,
        }
    }
}

/// Partial thresholds for one measurement; present fields replace the base
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOverride {
    /// New lower clamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f32>,
    /// New upper clamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f32>,
    /// New alert bands, same shape as the base
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_level: Option<AlertBands>,
}

/// Overrides keyed by measurement name (`"co2"`, `"temperature"`, ...)
pub type ThresholdOverrides = BTreeMap<String, ThresholdOverride>;

/// Validated thresholds for every configured measurement
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSet {
    specs: BTreeMap<SensorType, ThresholdSpec>,
}

impl ThresholdSet {
    /// Thresholds shipped with the device firmware
    pub fn firmware_defaults() -> Self {
        let specs = [
            (SensorType::Co2, ThresholdSpec::scalar(400.0, 5000.0, 1000.0, 2000.0)),
            (SensorType::Pm25, ThresholdSpec::scalar(0.0, 500.0, 35.0, 50.0)),
            (SensorType::Co, ThresholdSpec::scalar(0.0, 100.0, 25.0, 50.0)),
            (
                SensorType::Temperature,
                ThresholdSpec::range(-20.0, 50.0, Band::new(10.0, 35.0), Band::new(0.0, 40.0)),
            ),
            (
                SensorType::Humidity,
                ThresholdSpec::range(0.0, 100.0, Band::new(20.0, 80.0), Band::new(10.0, 90.0)),
            ),
        ];
        Self {
            specs: specs.into_iter().collect(),
        }
    }

    /// Parse a complete table from JSON and validate every entry
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let raw: BTreeMap<String, ThresholdEntry> = serde_json::from_str(json)?;

        let mut specs = BTreeMap::new();
        for (name, entry) in raw {
            let sensor_type = parse_sensor_type(&name)?;
            specs.insert(sensor_type, ThresholdSpec::from(entry));
        }

        let set = Self { specs };
        set.validate()?;
        Ok(set)
    }

    /// Serialize in the firmware JSON shape
    pub fn to_json_pretty(&self) -> Result<String, SchemaError> {
        let raw: BTreeMap<&str, ThresholdEntry> = self
            .specs
            .iter()
            .map(|(sensor_type, spec)| (sensor_type.name(), ThresholdEntry::from(*spec)))
            .collect();
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    /// Merge partial overrides into this set, then re-validate
    ///
    /// An override for a measurement with no base entry must be complete
    /// (`min`, `max` and `alert_level`). Alert bands must keep the base shape.
    pub fn apply_overrides(&mut self, overrides: &ThresholdOverrides) -> Result<(), SchemaError> {
        for (name, patch) in overrides {
            let sensor_type = parse_sensor_type(name)?;
            let merged = match self.specs.get(&sensor_type) {
                Some(base) => merge(sensor_type, base, patch)?,
                None => complete(sensor_type, patch)?,
            };
            log::debug!("Threshold override for {}: {:?}", sensor_type, merged);
            self.specs.insert(sensor_type, merged);
        }
        self.validate()
    }

    /// Check every spec is well ordered
    pub fn validate(&self) -> Result<(), SchemaError> {
        for (sensor_type, spec) in &self.specs {
            if !spec.is_well_ordered() {
                return Err(SchemaError::InvalidThresholds {
                    sensor_type: *sensor_type,
                    reason: "expected min <= max, warning <= critical and critical band enclosing warning band",
                });
            }
        }
        Ok(())
    }

    /// Thresholds of one measurement
    pub fn get(&self, sensor_type: SensorType) -> Option<&ThresholdSpec> {
        self.specs.get(&sensor_type)
    }

    /// Build the classifier table
    pub fn to_table(&self) -> Result<ThresholdTable, SchemaError> {
        self.validate()?;

        let mut table = ThresholdTable::new();
        for (sensor_type, spec) in &self.specs {
            table
                .insert(*sensor_type, *spec)
                .map_err(|_| SchemaError::InvalidThresholds {
                    sensor_type: *sensor_type,
                    reason: "threshold table is full",
                })?;
        }
        Ok(table)
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self::firmware_defaults()
    }
}

fn parse_sensor_type(name: &str) -> Result<SensorType, SchemaError> {
    SensorType::from_name(name).ok_or_else(|| SchemaError::UnknownSensorType(name.to_string()))
}

fn merge(
    sensor_type: SensorType,
    base: &ThresholdSpec,
    patch: &ThresholdOverride,
) -> Result<ThresholdSpec, SchemaError> {
    let alert = match (base.alert, patch.alert_level) {
        (_, None) => base.alert,
        (AlertBands::Scalar { .. }, Some(bands @ AlertBands::Scalar { .. }))
        | (AlertBands::Range { .. }, Some(bands @ AlertBands::Range { .. })) => bands,
        _ => {
            return Err(SchemaError::InvalidThresholds {
                sensor_type,
                reason: "alert_level override changes the band shape",
            })
        }
    };

    Ok(ThresholdSpec {
        min: patch.min.unwrap_or(base.min),
        max: patch.max.unwrap_or(base.max),
        alert,
    })
}

fn complete(sensor_type: SensorType, patch: &ThresholdOverride) -> Result<ThresholdSpec, SchemaError> {
    match (patch.min, patch.max, patch.alert_level) {
        (Some(min), Some(max), Some(alert)) => Ok(ThresholdSpec { min, max, alert }),
        _ => Err(SchemaError::InvalidThresholds {
            sensor_type,
            reason: "new entry needs min, max and alert_level",
        }),
    }
}
