//! Validation and Alert Classification
//!
//! ## Overview
//!
//! Every calibrated value passes through [`ThresholdTable::classify`] before it
//! enters a record. Classification does three things, in order:
//!
//! 1. **Clamp** into the configured `[min, max]` range
//! 2. **Round** to the reporting precision (2 decimals)
//! 3. **Tier** the clamped value as [`AlertLevel::Normal`], `Warning` or
//!    `Critical`
//!
//! Out-of-range values are rewritten, never rejected. A rewrite is reported
//! through [`Classification::corrected`] and logged at `warn` level so sensor
//! faults that hide behind plausible clamped values stay visible in the logs.
//!
//! ## Alert Bands
//!
//! ```text
//! Scalar (CO, CO2, PM2.5)         Range (temperature, humidity)
//!
//!  critical ─┬─ Critical           ──┬── critical.high ── Critical
//!  warning  ─┼─ Warning              ├── warning.high  ── Warning
//!            └─ Normal               ├── (comfort)     ── Normal
//!                                    ├── warning.low   ── Warning
//!                                  ──┴── critical.low  ── Critical
//! ```
//!
//! Critical takes precedence: a value outside both bands is `Critical`.
//!
//! ## Unknown Sensor Types
//!
//! A sensor type without a spec is passed through untouched and classified
//! `Normal`. Unconfigured instrumentation fails open.
//!
//! ## Usage
//!
//! ```rust
//! use airis_core::validators::{AlertLevel, Band, ThresholdSpec, ThresholdTable};
//! use airis_core::sensors::SensorType;
//!
//! let mut table = ThresholdTable::new();
//! table.insert(
//!     SensorType::Temperature,
//!     ThresholdSpec::range(-20.0, 50.0, Band::new(10.0, 35.0), Band::new(0.0, 40.0)),
//! )?;
//!
//! let result = table.classify(SensorType::Temperature, 42.0);
//! assert_eq!(result.value, 42.0);
//! assert_eq!(result.level, AlertLevel::Critical);
//! # Ok::<(), airis_core::validators::TableFull>(())
//! ```

mod thresholds;
mod utils;

pub use thresholds::{AlertBands, Band, ThresholdSpec};
pub use utils::{clamp_to_range, round_to_decimals};

use core::fmt;

use heapless::LinearMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    constants::{buffers::MAX_SENSOR_TYPES, sensors::REPORTING_DECIMALS},
    sensors::SensorType,
};

/// Alert tier, totally ordered `Normal < Warning < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum AlertLevel {
    /// Inside the comfort band
    #[default]
    Normal,
    /// Warning threshold breached
    Warning,
    /// Critical threshold breached
    Critical,
}

impl AlertLevel {
    /// Lowercase name used in payloads
    pub const fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    /// Rounded and clamped value
    pub value: f32,
    /// Alert tier of `value`
    pub level: AlertLevel,
    /// Whether clamping changed the value
    pub corrected: bool,
}

/// Threshold table has no room for another sensor type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFull;

impl fmt::Display for TableFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "threshold table holds at most {} sensor types", MAX_SENSOR_TYPES)
    }
}

/// Threshold specs keyed by sensor type
///
/// Built once from configuration and immutable for the rest of the run.
#[derive(Debug, Clone, Default)]
pub struct ThresholdTable {
    specs: LinearMap<SensorType, ThresholdSpec, MAX_SENSOR_TYPES>,
}

impl ThresholdTable {
    /// Empty table: every sensor type classifies `Normal`
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the thresholds of a sensor type
    pub fn insert(&mut self, sensor_type: SensorType, spec: ThresholdSpec) -> Result<(), TableFull> {
        self.specs
            .insert(sensor_type, spec)
            .map(|_| ())
            .map_err(|_| TableFull)
    }

    /// Spec of a sensor type, if configured
    pub fn get(&self, sensor_type: SensorType) -> Option<&ThresholdSpec> {
        self.specs.get(&sensor_type)
    }

    /// Configured sensor types and their specs
    pub fn iter(&self) -> impl Iterator<Item = (&SensorType, &ThresholdSpec)> {
        self.specs.iter()
    }

    /// Clamp, round and tier one value
    pub fn classify(&self, sensor_type: SensorType, value: f32) -> Classification {
        let Some(spec) = self.specs.get(&sensor_type) else {
            return Classification {
                value,
                level: AlertLevel::Normal,
                corrected: false,
            };
        };

        let (clamped, corrected) = clamp_to_range(value, spec.min, spec.max);
        if corrected {
            log::warn!("Corrected {}: {} -> {}", sensor_type, value, clamped);
        }
        // Bounds finer than the reporting precision can round past the edge
        let (rounded, _) = clamp_to_range(
            round_to_decimals(clamped, REPORTING_DECIMALS),
            spec.min,
            spec.max,
        );

        Classification {
            value: rounded,
            level: spec.alert_level(rounded),
            corrected,
        }
    }
}
