//! Time-Related Constants
//!
//! Sampling cadence of the telemetry loop and the LED timing contract of the
//! optical dust sensor.

// ===== SAMPLING =====

/// Default interval between successful deliveries (seconds).
pub const DEFAULT_SAMPLING_INTERVAL_S: u64 = 30;

/// Scheduler wake-up period while waiting for the next cycle (milliseconds).
///
/// Short enough that a shutdown request is noticed within about a second.
pub const SCHEDULER_TICK_MS: u64 = 1000;

/// Climate sensor settle time before a read (milliseconds).
///
/// DHT22 needs a short pause after the previous transaction.
pub const CLIMATE_SETTLE_MS: u32 = 200;

// ===== DUST SENSOR LED PULSE =====

/// Time between switching the IR LED on and sampling the output (milliseconds).
pub const DUST_LED_SETTLE_MS: u32 = 1;

/// Time the LED stays on after sampling (milliseconds).
pub const DUST_LED_HOLD_MS: u32 = 1;

/// Off time after the pulse before the sensor may be pulsed again (milliseconds).
pub const DUST_LED_RECOVERY_MS: u32 = 1;

// ===== NETWORK =====

/// Upper bound for a single delivery attempt (seconds).
pub const REQUEST_TIMEOUT_S: u64 = 10;
