//! Shared numeric helpers for validation
//!
//! Pure functions, no allocation, safe to call from any context.

use libm::roundf;

/// Clamp `value` into `[min, max]`
///
/// Returns the clamped value and whether it changed.
pub fn clamp_to_range(value: f32, min: f32, max: f32) -> (f32, bool) {
    if value < min {
        (min, true)
    } else if value > max {
        (max, true)
    } else {
        (value, false)
    }
}

/// Round to a fixed number of decimal places
pub fn round_to_decimals(value: f32, decimals: u8) -> f32 {
    let scale = libm::powf(10.0, decimals as f32);
    roundf(value * scale) / scale
}

/// Whether `value` lies outside the closed interval `[low, high]`
pub fn outside(value: f32, low: f32, high: f32) -> bool {
    value < low || value > high
}
