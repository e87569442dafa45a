//! Constants for AIRIS Core
//!
//! Every numeric value used by the calibration and acquisition code lives
//! here, with a note on where it comes from.
//!
//! ## Organization
//!
//! - **Sensors**: transfer-function coefficients, ADC and supply parameters
//! - **Time**: sampling cadence, LED pulse timing, network timeout
//! - **Buffers**: fixed table sizes for the allocation-free record types
//! - **Transport**: delivery failure policy
//!
//! Names carry their unit (`_MS`, `_PPM`, `_V`) so call sites stay readable.

/// Sensor transfer-function coefficients and converter parameters.
pub mod sensors;

/// Sampling cadence, pulse timing and timeouts.
pub mod time;

/// Fixed capacities for sensor tables and records.
pub mod buffers;

/// Delivery failure policy.
pub mod transport;

pub use sensors::{
    ADC_BIT_RESOLUTION, ADC_MAX, CO2_BASELINE_PPM, DUST_OFFSET_MG_M3, DUST_SLOPE_MG_M3_PER_V,
    R0_WARMUP_SAMPLES, REPORTING_DECIMALS,
};

pub use time::{DEFAULT_SAMPLING_INTERVAL_S, REQUEST_TIMEOUT_S, SCHEDULER_TICK_MS};

pub use buffers::{MAX_DEVICE_ID_LEN, MAX_SENSORS, MAX_SENSOR_TYPES};

pub use transport::MAX_CONSECUTIVE_ERRORS;
