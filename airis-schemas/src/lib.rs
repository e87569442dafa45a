//! Configuration Schemas for AIRIS Nodes
//!
//! ## Overview
//!
//! `airis-core` knows how to calibrate and classify, but not *which*
//! coefficients and thresholds a deployment uses. This crate holds that
//! knowledge as plain JSON-compatible data:
//!
//! - [`ThresholdSet`]: per-measurement clamping range and alert bands
//! - [`CalibrationSet`]: transfer-function coefficients per sensor device
//! - [`Profile`]: a named deployment (office, home, industrial) bundling a
//!   sampling interval with partial threshold overrides
//!
//! Everything is validated once at load time. A threshold table that reaches
//! the classifier is guaranteed to be well ordered.
//!
//! ## Wire Format
//!
//! Thresholds use the same shape as the device firmware configuration:
//!
//! ```json
//! {
//!   "co2": {
//!     "min": 400, "max": 5000,
//!     "alert_level": { "warning": 1000, "critical": 2000 }
//!   },
//!   "temperature": {
//!     "min": -20, "max": 50,
//!     "alert_level": {
//!       "warning":  { "low": 10, "high": 35 },
//!       "critical": { "low": 0,  "high": 40 }
//!     }
//!   }
//! }
//! ```
//!
//! Calibration coefficients keep the firmware field names:
//!
//! ```json
//! { "mq7": { "slope": 99.042, "intercept": -1.518, "r0": 27.5 } }
//! ```
//!
//! ## Override Merge
//!
//! Profiles and deployment files carry *partial* overrides. Each field that is
//! present replaces the base value; absent fields are inherited:
//!
//! ```text
//! base  co2 {min 400, max 5000, alert {1000, 2000}}
//! over  co2 {         max 1000, alert { 800, 1200}}
//! ────────────────────────────────────────────────
//! merged co2 {min 400, max 1000, alert { 800, 1200}}
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use airis_schemas::profiles;
//! use airis_core::{AlertLevel, SensorType};
//!
//! let office = profiles::profile("office")?;
//! let table = office.thresholds()?.to_table()?;
//!
//! assert_eq!(table.classify(SensorType::Co2, 900.0).level, AlertLevel::Warning);
//! assert_eq!(office.sampling_interval_s, 15);
//! # Ok::<(), airis_schemas::SchemaError>(())
//! ```

pub mod calibration;
pub mod profiles;
pub mod thresholds;

pub use calibration::{CalibrationOverride, CalibrationSet};
pub use profiles::Profile;
pub use thresholds::{ThresholdEntry, ThresholdOverride, ThresholdOverrides, ThresholdSet};

use airis_core::{SensorKind, SensorType};

/// Configuration loading errors
#[derive(Debug, thiserror_no_std::Error)]
pub enum SchemaError {
    /// Document is not valid JSON or has the wrong shape
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Measurement name not recognised
    #[error("Unknown sensor type: {0}")]
    UnknownSensorType(String),

    /// Device name not recognised
    #[error("Unknown sensor kind: {0}")]
    UnknownSensorKind(String),

    /// Threshold spec is not well ordered
    #[error("Invalid thresholds for {sensor_type}: {reason}")]
    InvalidThresholds {
        /// Offending measurement
        sensor_type: SensorType,
        /// What is wrong
        reason: &'static str,
    },

    /// Calibration coefficients unusable
    #[error("Invalid calibration for {kind}: {reason}")]
    InvalidCalibration {
        /// Offending device
        kind: SensorKind,
        /// What is wrong
        reason: &'static str,
    },

    /// Named profile or calibration batch does not exist
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::Parse(err.to_string())
    }
}
