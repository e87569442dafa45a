//! Fixed Capacities
//!
//! Records and sensor tables use `heapless` containers, so their sizes are
//! fixed here.

/// Maximum number of physical sensors on one device.
pub const MAX_SENSORS: usize = 8;

/// Maximum number of distinct measurements in one record.
pub const MAX_SENSOR_TYPES: usize = 8;

/// Maximum length of a device identifier in bytes.
pub const MAX_DEVICE_ID_LEN: usize = 48;
