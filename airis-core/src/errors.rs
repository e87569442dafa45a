//! Error Types for Sensor Acquisition and Calibration
//!
//! ## Design Philosophy
//!
//! The acquisition path runs on the device itself, so errors follow the same
//! rules as the rest of the crate:
//!
//! 1. **No Heap Allocation**: messages are `&'static str`, lists are
//!    `heapless::Vec` with a compile-time bound.
//! 2. **Copy Semantics**: the per-sensor errors are `Copy` so they can be
//!    recorded in a cycle report without cloning.
//! 3. **Explicit Results**: a sensor that failed never turns into a zero
//!    reading. Callers always see `Err(..)`.
//!
//! ## Error Categories
//!
//! ### Hardware
//! - `HardwareFault`: the bus or device did not answer (ADC timeout, sensor
//!   checksum failure, GPIO write refused)
//!
//! ### Calibration
//! - `CalibrationError`: the raw sample cannot be turned into a physical
//!   value (zero voltage, missing `R0`, non-finite intermediate)
//!
//! ### Cycle
//! - `SensorError`: why one sensor produced nothing this cycle
//! - `CycleFailure`: every required sensor that failed during one cycle
//!
//! ### Setup
//! - `SetupError`: the sensor table itself is unusable
//!
//! Clamping a reading into its configured range is **not** an error. It is
//! reported through [`Classification::corrected`](crate::validators::Classification)
//! and logged as a correction.

use heapless::Vec;
use thiserror_no_std::Error;

use crate::constants::buffers::MAX_SENSORS;
use crate::sensors::{SensorKind, SensorType};

/// Result type for calibration operations
pub type CalibrationResult<T> = Result<T, CalibrationError>;

/// Fault reported by a hardware collaborator
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("hardware fault: {0}")]
pub struct HardwareFault(pub &'static str);

/// Raw sample could not be converted into a physical value
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum CalibrationError {
    /// Measured voltage was zero, the resistance ratio is undefined
    #[error("zero voltage on analog input")]
    ZeroVoltage,

    /// Raw count above the converter's full-scale value
    #[error("raw sample {raw} exceeds ADC maximum {max}")]
    OutOfDomain {
        /// Sample as read from the converter
        raw: u16,
        /// Full-scale count for the configured resolution
        max: u16,
    },

    /// A parameter needed by the transfer function is absent or unusable
    #[error("missing calibration parameter: {name}")]
    MissingParameter {
        /// Parameter name as used in configuration
        name: &'static str,
    },

    /// An intermediate or final value was NaN or infinite
    #[error("non-finite value while computing {stage}")]
    NonFinite {
        /// Computation step that produced the value
        stage: &'static str,
    },

    /// Sample shape does not match the sensor (e.g. analog count for a climate sensor)
    #[error("{kind} cannot produce {sensor_type}")]
    Unsupported {
        /// Sensor that was asked
        kind: SensorKind,
        /// Measurement that was requested
        sensor_type: SensorType,
    },
}

/// Why a single sensor produced no reading this cycle
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SensorError {
    /// Sensor failed to initialise and is excluded from acquisition
    #[error("sensor unavailable: {reason}")]
    Unavailable {
        /// Reason recorded at start-up
        reason: &'static str,
    },

    /// Bus or device fault during the read
    #[error(transparent)]
    Hardware(#[from] HardwareFault),

    /// The device answered but had no data (e.g. climate sensor returned nothing)
    #[error("sensor returned no data")]
    NoData,

    /// The sample could not be calibrated
    #[error(transparent)]
    Calibration(#[from] CalibrationError),
}

/// One sensor's failure inside a cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorFailure {
    /// Which sensor failed
    pub kind: SensorKind,
    /// Input channel or pin of the sensor
    pub channel: u8,
    /// What went wrong
    pub error: SensorError,
}

/// A cycle that produced no record because required sensors failed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} required sensor(s) failed", .failures.len())]
pub struct CycleFailure {
    /// Every required sensor that failed, in acquisition order
    pub failures: Vec<SensorFailure, MAX_SENSORS>,
}

impl CycleFailure {
    /// Whether the given sensor kind is among the failures
    pub fn involves(&self, kind: SensorKind) -> bool {
        self.failures.iter().any(|f| f.kind == kind)
    }
}

/// Sensor table cannot be used to build an aggregator
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupError {
    /// More sensors than the fixed-size tables hold
    #[error("at most {max} sensors are supported")]
    TooManySensors {
        /// Capacity of the sensor table
        max: usize,
    },

    /// Two sensors report the same measurement
    #[error("sensor type {0} is produced by more than one sensor")]
    DuplicateSensorType(SensorType),

    /// Device identifier does not fit the record's fixed-size buffer
    #[error("device id longer than {max} bytes")]
    DeviceIdTooLong {
        /// Maximum identifier length
        max: usize,
    },
}
