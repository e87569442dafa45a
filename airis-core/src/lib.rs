//! Sensor telemetry core for AIRIS air-quality nodes
//!
//! Turns raw sensor samples into calibrated, classified readings and
//! assembles them into one record per acquisition cycle.
//! Designed to run on the sensor board itself.
//!
//! Key constraints:
//! - Runs on an ESP32-class microcontroller
//! - No heap allocation in the acquisition path
//! - A failed sensor is an error, never a zero reading
//!
//! ```no_run
//! use airis_core::{Aggregator, SensorConfig, SensorKind, ThresholdTable};
//! use airis_core::record::device_id;
//! # fn run<B: airis_core::traits::SensorBus>(bus: B) -> Result<(), airis_core::errors::SetupError> {
//!
//! let sensors = [
//!     SensorConfig::new(SensorKind::Mq7, 32),
//!     SensorConfig::new(SensorKind::Gp2y1014, 34).with_led_pin(4),
//! ];
//! let mut aggregator =
//!     Aggregator::new(bus, airis_core::time::SystemTime, ThresholdTable::new(), &sensors)?;
//! aggregator.start();
//!
//! match aggregator.acquire_cycle(&device_id("esp32-01")?) {
//!     Ok(record) => {}, // Hand over to transmission
//!     Err(failure) => {}, // Log and retry next cycle
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod aggregator;
pub mod calibration;
pub mod constants;
pub mod errors;
pub mod record;
pub mod sensors;
pub mod time;
pub mod traits;
pub mod validators;

// Public API
pub use aggregator::{Aggregator, SensorConfig, SensorStatus};
pub use calibration::{calibrate, CalibratedReading, CalibrationParameters, RawSample};
pub use errors::{CalibrationError, CycleFailure, HardwareFault, SensorError, SetupError};
pub use record::{CompositeRecord, DeviceId};
pub use sensors::{SensorKind, SensorType, Unit};
pub use validators::{AlertLevel, Classification, ThresholdSpec, ThresholdTable};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
