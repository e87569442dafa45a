//! Delivery Failure Policy

/// Consecutive delivery failures after which records are spilled to disk.
///
/// The failure that brings the counter to this value is the first one spilled.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;
