//! Sensor Registry
//!
//! The set of sensors the firmware knows about is closed, so it is modelled
//! as two enums instead of a name-to-constructor table:
//!
//! - [`SensorType`]: *what* is measured (CO2, PM2.5, CO, temperature, humidity)
//! - [`SensorKind`]: *which device* measures it (MQ-7, MQ-135, GP2Y1014AU, DHT22)
//!
//! Each `SensorKind` maps at compile time to the measurements it produces and
//! to the bus capabilities it needs. The aggregator uses that mapping to route
//! raw samples to the right transfer function in
//! [`calibration`](crate::calibration).
//!
//! ```rust
//! use airis_core::sensors::{SensorKind, SensorType, Capability};
//!
//! assert_eq!(SensorKind::Dht22.produces(), &[SensorType::Temperature, SensorType::Humidity]);
//! assert!(SensorKind::Gp2y1014.requires(Capability::DigitalOutput));
//! ```

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physical quantity reported in a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SensorType {
    /// Carbon dioxide (ppm)
    Co2,
    /// Fine particulate matter (mg/m³)
    Pm25,
    /// Carbon monoxide (ppm)
    Co,
    /// Air temperature (°C)
    Temperature,
    /// Relative humidity (%)
    Humidity,
}

impl SensorType {
    /// Every measurement, in payload order
    pub const ALL: [SensorType; 5] = [
        SensorType::Co2,
        SensorType::Pm25,
        SensorType::Co,
        SensorType::Temperature,
        SensorType::Humidity,
    ];

    /// Name used in configuration files and payloads
    pub const fn name(&self) -> &'static str {
        match self {
            SensorType::Co2 => "co2",
            SensorType::Pm25 => "pm25",
            SensorType::Co => "co",
            SensorType::Temperature => "temperature",
            SensorType::Humidity => "humidity",
        }
    }

    /// Unit the calibrated value is expressed in
    pub const fn unit(&self) -> Unit {
        match self {
            SensorType::Co2 | SensorType::Co => Unit::Ppm,
            SensorType::Pm25 => Unit::MilligramsPerCubicMeter,
            SensorType::Temperature => Unit::Celsius,
            SensorType::Humidity => Unit::Percent,
        }
    }

    /// Look up a sensor type by its configuration name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unit of a calibrated value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Unit {
    /// Parts per million
    Ppm,
    /// Milligrams per cubic metre
    MilligramsPerCubicMeter,
    /// Degrees Celsius
    Celsius,
    /// Percent (relative humidity)
    Percent,
}

impl Unit {
    /// Display symbol
    pub const fn symbol(&self) -> &'static str {
        match self {
            Unit::Ppm => "ppm",
            Unit::MilligramsPerCubicMeter => "mg/m³",
            Unit::Celsius => "°C",
            Unit::Percent => "%",
        }
    }
}

/// Bus capability a sensor needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Raw ADC channel read
    AnalogInput,
    /// GPIO output (dust sensor LED)
    DigitalOutput,
    /// Single-wire climate sensor protocol
    ClimateSensor,
}

/// Physical sensor fitted to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SensorKind {
    /// Winsen MQ-7 carbon monoxide sensor
    Mq7,
    /// Winsen MQ-135 air-quality sensor, read as a CO2 proxy
    Mq135,
    /// Sharp GP2Y1014AU optical dust sensor
    Gp2y1014,
    /// Aosong DHT22 temperature/humidity sensor
    Dht22,
}

impl SensorKind {
    /// Every supported device
    pub const ALL: [SensorKind; 4] = [
        SensorKind::Mq7,
        SensorKind::Mq135,
        SensorKind::Gp2y1014,
        SensorKind::Dht22,
    ];

    /// Lowercase name used in configuration files
    pub const fn config_name(&self) -> &'static str {
        match self {
            SensorKind::Mq7 => "mq7",
            SensorKind::Mq135 => "mq135",
            SensorKind::Gp2y1014 => "gp2y1014",
            SensorKind::Dht22 => "dht22",
        }
    }

    /// Look up a device by configuration or device name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| {
            k.config_name().eq_ignore_ascii_case(name) || k.name().eq_ignore_ascii_case(name)
        })
    }

    /// Device name for logs
    pub const fn name(&self) -> &'static str {
        match self {
            SensorKind::Mq7 => "MQ7",
            SensorKind::Mq135 => "MQ135",
            SensorKind::Gp2y1014 => "GP2Y1014AU",
            SensorKind::Dht22 => "DHT22",
        }
    }

    /// Measurements this sensor contributes to a record
    pub const fn produces(&self) -> &'static [SensorType] {
        match self {
            SensorKind::Mq7 => &[SensorType::Co],
            SensorKind::Mq135 => &[SensorType::Co2],
            SensorKind::Gp2y1014 => &[SensorType::Pm25],
            SensorKind::Dht22 => &[SensorType::Temperature, SensorType::Humidity],
        }
    }

    /// Bus capabilities needed to read this sensor
    pub const fn capabilities(&self) -> &'static [Capability] {
        match self {
            SensorKind::Mq7 | SensorKind::Mq135 => &[Capability::AnalogInput],
            SensorKind::Gp2y1014 => &[Capability::AnalogInput, Capability::DigitalOutput],
            SensorKind::Dht22 => &[Capability::ClimateSensor],
        }
    }

    /// Whether the sensor needs the given capability
    pub fn requires(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Whether the transfer function depends on a clean-air baseline `R0`
    pub const fn needs_baseline(&self) -> bool {
        matches!(self, SensorKind::Mq7)
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for sensor_type in SensorType::ALL {
            assert_eq!(SensorType::from_name(sensor_type.name()), Some(sensor_type));
        }
        assert_eq!(SensorType::from_name("pressure"), None);
        assert_eq!(SensorKind::from_name("gp2y1014au"), Some(SensorKind::Gp2y1014));
        assert_eq!(SensorKind::from_name("gp2y1014"), Some(SensorKind::Gp2y1014));
        assert_eq!(SensorKind::from_name("mq7"), Some(SensorKind::Mq7));
        for kind in SensorKind::ALL {
            assert_eq!(SensorKind::from_name(kind.config_name()), Some(kind));
        }
    }

    #[test]
    fn every_type_has_one_producer() {
        for sensor_type in SensorType::ALL {
            let producers = SensorKind::ALL
                .iter()
                .filter(|k| k.produces().contains(&sensor_type))
                .count();
            assert_eq!(producers, 1, "{sensor_type}");
        }
    }

    #[test]
    fn only_mq7_needs_baseline() {
        assert!(SensorKind::Mq7.needs_baseline());
        assert!(!SensorKind::Mq135.needs_baseline());
        assert!(!SensorKind::Gp2y1014.requires(Capability::ClimateSensor));
    }
}
