//! Hardware capability traits
//!
//! The acquisition code never touches registers. It consumes four narrow
//! capabilities, implemented by the board support layer (or by a simulated
//! bus off-device). Keep them simple: one call per bus transaction.

use crate::errors::HardwareFault;

/// Logic level of a digital output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Pin driven low
    Low,
    /// Pin driven high
    High,
}

/// Temperature and humidity pair returned by a climate sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSample {
    /// Air temperature (°C)
    pub temperature: f32,
    /// Relative humidity (%)
    pub humidity: f32,
}

/// Raw analog-to-digital conversion
pub trait AnalogInput {
    /// Read one raw count from `channel`
    ///
    /// Returns `nb::Error::WouldBlock` while a conversion is still running.
    fn read_raw(&mut self, channel: u8) -> nb::Result<u16, HardwareFault>;
}

/// Digital output control
pub trait DigitalOutput {
    /// Drive `pin` to `level`
    fn set_level(&mut self, pin: u8, level: Level) -> Result<(), HardwareFault>;
}

/// Single-wire temperature/humidity sensor
pub trait ClimateSensor {
    /// Run one measurement on the sensor attached to `pin`
    ///
    /// `Ok(None)` means the sensor answered but produced no usable frame.
    fn read_climate(&mut self, pin: u8) -> Result<Option<ClimateSample>, HardwareFault>;
}

/// Blocking delay
pub trait Delay {
    /// Pause for `ms` milliseconds
    fn delay_ms(&mut self, ms: u32);
}

/// Everything the aggregator needs from the board
pub trait SensorBus: AnalogInput + DigitalOutput + ClimateSensor + Delay {}

impl<T> SensorBus for T where T: AnalogInput + DigitalOutput + ClimateSensor + Delay {}
