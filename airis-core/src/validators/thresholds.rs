//! Threshold specifications
//!
//! A threshold spec has two jobs: the absolute `[min, max]` range a reported
//! value is clamped into, and the alert bands that decide its tier.
//!
//! Monotonic pollutants (CO, CO2, PM2.5) only get worse upwards, so their
//! bands are single scalars. Temperature and humidity are bad in both
//! directions, so their bands are `low..high` intervals.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::{utils, AlertLevel};

/// Closed interval `[low, high]`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Band {
    /// Lower bound (inclusive)
    pub low: f32,
    /// Upper bound (inclusive)
    pub high: f32,
}

impl Band {
    /// Create a band
    pub const fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Whether `value` lies inside the band
    pub fn contains(&self, value: f32) -> bool {
        !utils::outside(value, self.low, self.high)
    }

    /// Whether `other` lies entirely inside this band
    pub fn encloses(&self, other: &Band) -> bool {
        self.low <= other.low && other.high <= self.high
    }
}

/// Alert boundaries of a sensor type
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum AlertBands {
    /// Escalates upwards only: `v ≥ warning` warns, `v ≥ critical` is critical
    Scalar {
        /// Warning threshold
        warning: f32,
        /// Critical threshold
        critical: f32,
    },
    /// Escalates away from a comfort band in both directions
    Range {
        /// Leaving this band warns
        warning: Band,
        /// Leaving this band is critical
        critical: Band,
    },
}

/// Absolute range and alert bands for one sensor type
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThresholdSpec {
    /// Lowest reportable value
    pub min: f32,
    /// Highest reportable value
    pub max: f32,
    /// Alert boundaries
    pub alert: AlertBands,
}

impl ThresholdSpec {
    /// Spec for a monotonic sensor
    pub const fn scalar(min: f32, max: f32, warning: f32, critical: f32) -> Self {
        Self {
            min,
            max,
            alert: AlertBands::Scalar { warning, critical },
        }
    }

    /// Spec for a bidirectional sensor
    pub const fn range(min: f32, max: f32, warning: Band, critical: Band) -> Self {
        Self {
            min,
            max,
            alert: AlertBands::Range { warning, critical },
        }
    }

    /// Alert tier of an already clamped value
    ///
    /// For range sensors a value outside the critical band is `Critical` even
    /// though it is also outside the warning band.
    pub fn alert_level(&self, value: f32) -> AlertLevel {
        match self.alert {
            AlertBands::Scalar { warning, critical } => {
                if value >= critical {
                    AlertLevel::Critical
                } else if value >= warning {
                    AlertLevel::Warning
                } else {
                    AlertLevel::Normal
                }
            }
            AlertBands::Range { warning, critical } => {
                if !critical.contains(value) {
                    AlertLevel::Critical
                } else if !warning.contains(value) {
                    AlertLevel::Warning
                } else {
                    AlertLevel::Normal
                }
            }
        }
    }

    /// Whether the thresholds are internally ordered
    ///
    /// `min ≤ max`, scalar `warning ≤ critical`, range critical band enclosing
    /// the warning band. Checked once when configuration is loaded.
    pub fn is_well_ordered(&self) -> bool {
        let finite = self.min.is_finite() && self.max.is_finite();
        let bands = match self.alert {
            AlertBands::Scalar { warning, critical } => {
                warning.is_finite() && critical.is_finite() && warning <= critical
            }
            AlertBands::Range { warning, critical } => {
                [warning.low, warning.high, critical.low, critical.high]
                    .iter()
                    .all(|v| v.is_finite())
                    && warning.low <= warning.high
                    && critical.encloses(&warning)
            }
        };
        finite && self.min <= self.max && bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temperature() -> ThresholdSpec {
        ThresholdSpec::range(-20.0, 50.0, Band::new(10.0, 35.0), Band::new(0.0, 40.0))
    }

    #[test]
    fn scalar_tiers() {
        let co = ThresholdSpec::scalar(0.0, 100.0, 25.0, 50.0);

        assert_eq!(co.alert_level(10.0), AlertLevel::Normal);
        assert_eq!(co.alert_level(25.0), AlertLevel::Warning);
        assert_eq!(co.alert_level(49.99), AlertLevel::Warning);
        assert_eq!(co.alert_level(50.0), AlertLevel::Critical);
    }

    #[test]
    fn range_tiers() {
        let spec = temperature();

        assert_eq!(spec.alert_level(22.0), AlertLevel::Normal);
        assert_eq!(spec.alert_level(37.0), AlertLevel::Warning);
        assert_eq!(spec.alert_level(5.0), AlertLevel::Warning);
        assert_eq!(spec.alert_level(-5.0), AlertLevel::Critical);
    }

    #[test]
    fn outside_both_bands_is_critical() {
        assert_eq!(temperature().alert_level(42.0), AlertLevel::Critical);
    }

    #[test]
    fn ordering_checks() {
        assert!(temperature().is_well_ordered());
        assert!(ThresholdSpec::scalar(400.0, 5000.0, 1000.0, 2000.0).is_well_ordered());

        // Warning above critical
        assert!(!ThresholdSpec::scalar(0.0, 100.0, 60.0, 50.0).is_well_ordered());
        // Critical band narrower than warning band
        let inverted =
            ThresholdSpec::range(-20.0, 50.0, Band::new(0.0, 40.0), Band::new(10.0, 35.0));
        assert!(!inverted.is_well_ordered());
        // min above max
        assert!(!ThresholdSpec::scalar(10.0, 0.0, 1.0, 2.0).is_well_ordered());
    }

    #[test]
    fn range_bands_must_be_finite() {
        let open = ThresholdSpec::range(
            -20.0,
            50.0,
            Band::new(10.0, 35.0),
            Band::new(f32::NEG_INFINITY, f32::INFINITY),
        );
        assert!(!open.is_well_ordered());

        let unset = ThresholdSpec::range(
            -20.0,
            50.0,
            Band::new(f32::NAN, 35.0),
            Band::new(0.0, 40.0),
        );
        assert!(!unset.is_well_ordered());
    }
}
