//! Deployment Profiles
//!
//! A profile tunes a node for the room it is installed in: how often it
//! samples and which thresholds differ from the firmware defaults. Profiles
//! are looked up by name from a static registry.

use std::collections::BTreeMap;

use airis_core::constants::DEFAULT_SAMPLING_INTERVAL_S;
use airis_core::validators::{AlertBands, Band};
use lazy_static::lazy_static;

use crate::{SchemaError, ThresholdOverride, ThresholdOverrides, ThresholdSet};

/// Named deployment preset
#[derive(Debug, Clone)]
pub struct Profile {
    /// Registry key
    pub name: &'static str,
    /// Suggested device identifier
    pub device_id: Option<&'static str>,
    /// Suggested installation location
    pub location: Option<&'static str>,
    /// Seconds between successful deliveries
    pub sampling_interval_s: u64,
    /// Partial overrides on top of the firmware thresholds
    pub overrides: ThresholdOverrides,
}

impl Profile {
    /// Firmware thresholds with this profile's overrides merged in
    pub fn thresholds(&self) -> Result<ThresholdSet, SchemaError> {
        let mut set = ThresholdSet::firmware_defaults();
        set.apply_overrides(&self.overrides)?;
        Ok(set)
    }
}

fn scalar(min: Option<f32>, max: Option<f32>, warning: f32, critical: f32) -> ThresholdOverride {
    ThresholdOverride {
        min,
        max,
        alert_level: Some(AlertBands::Scalar { warning, critical }),
    }
}

lazy_static! {
    /// Built-in deployment profiles
    static ref PROFILES: BTreeMap<&'static str, Profile> = {
        let mut profiles = BTreeMap::new();

        profiles.insert("default", Profile {
            name: "default",
            device_id: None,
            location: None,
            sampling_interval_s: DEFAULT_SAMPLING_INTERVAL_S,
            overrides: ThresholdOverrides::new(),
        });

        let mut office = ThresholdOverrides::new();
        office.insert("co2".to_string(), scalar(None, Some(1000.0), 800.0, 1200.0));
        profiles.insert("office", Profile {
            name: "office",
            device_id: Some("AIRIS_OFFICE_01"),
            location: Some("Main Office Conference Room"),
            sampling_interval_s: 15,
            overrides: office,
        });

        let mut home = ThresholdOverrides::new();
        home.insert("temperature".to_string(), ThresholdOverride {
            min: Some(18.0),
            max: Some(28.0),
            alert_level: Some(AlertBands::Range {
                warning: Band::new(20.0, 26.0),
                critical: Band::new(15.0, 30.0),
            }),
        });
        profiles.insert("home", Profile {
            name: "home",
            device_id: Some("AIRIS_HOME_001"),
            location: Some("Living Room"),
            sampling_interval_s: 60,
            overrides: home,
        });

        let mut industrial = ThresholdOverrides::new();
        industrial.insert("co".to_string(), scalar(None, Some(50.0), 25.0, 40.0));
        industrial.insert("pm25".to_string(), scalar(None, Some(250.0), 100.0, 200.0));
        profiles.insert("industrial", Profile {
            name: "industrial",
            device_id: Some("AIRIS_INDUSTRIAL_001"),
            location: Some("Factory Floor"),
            sampling_interval_s: 10,
            overrides: industrial,
        });

        profiles
    };
}

/// Look up a profile by name
pub fn profile(name: &str) -> Result<&'static Profile, SchemaError> {
    PROFILES
        .get(name)
        .ok_or_else(|| SchemaError::NotFound(format!("profile {}", name)))
}

/// Names of every registered profile
pub fn profile_names() -> impl Iterator<Item = &'static str> {
    PROFILES.keys().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use airis_core::{AlertLevel, SensorType, ThresholdSpec};

    #[test]
    fn every_profile_merges_cleanly() {
        for name in profile_names() {
            let profile = profile(name).unwrap();
            profile.thresholds().unwrap().to_table().unwrap();
            assert!(profile.sampling_interval_s > 0);
        }
        assert_eq!(profile_names().count(), 4);
    }

    #[test]
    fn default_profile_is_firmware() {
        let profile = profile("default").unwrap();
        assert_eq!(profile.thresholds().unwrap(), ThresholdSet::firmware_defaults());
        assert_eq!(profile.sampling_interval_s, 30);
    }

    #[test]
    fn home_narrows_temperature() {
        let set = profile("home").unwrap().thresholds().unwrap();
        assert_eq!(
            set.get(SensorType::Temperature),
            Some(&ThresholdSpec::range(18.0, 28.0, Band::new(20.0, 26.0), Band::new(15.0, 30.0)))
        );

        // 35 °C clamps to 28, which only warns under the home bands
        let result = set.to_table().unwrap().classify(SensorType::Temperature, 35.0);
        assert_eq!(result.value, 28.0);
        assert!(result.corrected);
        assert_eq!(result.level, AlertLevel::Warning);
    }

    #[test]
    fn industrial_keeps_untouched_fields() {
        let set = profile("industrial").unwrap().thresholds().unwrap();
        assert_eq!(set.get(SensorType::Co), Some(&ThresholdSpec::scalar(0.0, 50.0, 25.0, 40.0)));
        assert_eq!(set.get(SensorType::Pm25), Some(&ThresholdSpec::scalar(0.0, 250.0, 100.0, 200.0)));
        assert_eq!(
            set.get(SensorType::Co2),
            ThresholdSet::firmware_defaults().get(SensorType::Co2)
        );
        assert_eq!(profile("industrial").unwrap().sampling_interval_s, 10);
    }

    #[test]
    fn unknown_profile_not_found() {
        assert!(matches!(profile("warehouse"), Err(SchemaError::NotFound(_))));
    }
}
