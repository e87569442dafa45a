//! Simulated sensor bus
//!
//! Stands in for the ESP32 peripherals when the node runs on a host:
//! - ADC channels return random counts in `1000..4000`
//! - The climate sensor reports a steady 25 °C / 50 %
//! - GPIO writes are remembered so tests can inspect them
//!
//! Channels can be marked broken to exercise the failure paths. Delays on an
//! entropy-seeded bus really sleep; the scheduler only touches the bus from
//! Tokio's blocking pool.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use airis_core::{
    errors::HardwareFault,
    traits::{AnalogInput, ClimateSensor, ClimateSample, Delay, DigitalOutput, Level},
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Range of simulated ADC counts
const SIMULATED_ADC_RANGE: std::ops::Range<u16> = 1000..4000;

/// Host-side stand-in for the sensor board
#[derive(Debug)]
pub struct SimulatedBus {
    rng: StdRng,
    climate: ClimateSample,
    broken: BTreeSet<u8>,
    levels: BTreeMap<u8, Level>,
    realtime: bool,
}

impl SimulatedBus {
    /// Bus seeded from OS entropy, delays actually sleep
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy(), true)
    }

    /// Reproducible bus whose delays return immediately
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), false)
    }

    fn with_rng(rng: StdRng, realtime: bool) -> Self {
        Self {
            rng,
            climate: ClimateSample { temperature: 25.0, humidity: 50.0 },
            broken: BTreeSet::new(),
            levels: BTreeMap::new(),
            realtime,
        }
    }

    /// Every read on `channel` fails from now on
    pub fn break_channel(&mut self, channel: u8) {
        self.broken.insert(channel);
    }

    /// Reads on `channel` work again
    pub fn repair_channel(&mut self, channel: u8) {
        self.broken.remove(&channel);
    }

    /// Change the climate sensor reading
    pub fn set_climate(&mut self, temperature: f32, humidity: f32) {
        self.climate = ClimateSample { temperature, humidity };
    }

    /// Last level driven on `pin`
    pub fn level(&self, pin: u8) -> Option<Level> {
        self.levels.get(&pin).copied()
    }
}

impl Default for SimulatedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogInput for SimulatedBus {
    fn read_raw(&mut self, channel: u8) -> nb::Result<u16, HardwareFault> {
        if self.broken.contains(&channel) {
            return Err(nb::Error::Other(HardwareFault("simulated ADC fault")));
        }
        Ok(self.rng.gen_range(SIMULATED_ADC_RANGE))
    }
}

impl DigitalOutput for SimulatedBus {
    fn set_level(&mut self, pin: u8, level: Level) -> Result<(), HardwareFault> {
        if self.broken.contains(&pin) {
            return Err(HardwareFault("simulated GPIO fault"));
        }
        log::trace!("GPIO {} -> {:?}", pin, level);
        self.levels.insert(pin, level);
        Ok(())
    }
}

impl ClimateSensor for SimulatedBus {
    fn read_climate(&mut self, pin: u8) -> Result<Option<ClimateSample>, HardwareFault> {
        if self.broken.contains(&pin) {
            return Err(HardwareFault("simulated sensor timeout"));
        }
        Ok(Some(self.climate))
    }
}

impl Delay for SimulatedBus {
    fn delay_ms(&mut self, ms: u32) {
        if self.realtime {
            std::thread::sleep(Duration::from_millis(u64::from(ms)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adc_counts_stay_in_range() {
        let mut bus = SimulatedBus::seeded(7);
        for _ in 0..1000 {
            let raw = bus.read_raw(32).unwrap();
            assert!(SIMULATED_ADC_RANGE.contains(&raw));
        }
    }

    #[test]
    fn broken_channel_faults() {
        let mut bus = SimulatedBus::seeded(7);
        bus.break_channel(34);
        assert!(matches!(bus.read_raw(34), Err(nb::Error::Other(_))));

        bus.repair_channel(34);
        assert!(bus.read_raw(34).is_ok());
    }

    #[test]
    fn climate_and_gpio() {
        let mut bus = SimulatedBus::seeded(1);
        assert_eq!(
            bus.read_climate(27).unwrap(),
            Some(ClimateSample { temperature: 25.0, humidity: 50.0 })
        );

        bus.set_level(4, Level::Low).unwrap();
        assert_eq!(bus.level(4), Some(Level::Low));
        assert_eq!(bus.level(5), None);
    }
}
