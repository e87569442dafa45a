//! Optical dust sensor (GP2Y1014AU)
//!
//! The sensor only produces a valid output while its IR LED is pulsed, so the
//! raw read is wrapped in a fixed LED sequence. The LED input is active-low.

use super::{finite, CalibrationParameters};
use crate::{
    constants::{
        sensors::{DUST_OFFSET_MG_M3, DUST_SLOPE_MG_M3_PER_V},
        time::{DUST_LED_HOLD_MS, DUST_LED_RECOVERY_MS, DUST_LED_SETTLE_MS},
    },
    errors::{CalibrationResult, HardwareFault},
    traits::{AnalogInput, Delay, DigitalOutput, Level},
};

/// Dust density from a raw sample (mg/m³)
///
/// Voltages below the fit's zero crossing clamp to 0.0 rather than failing.
pub fn dust_density(raw: u16, params: &CalibrationParameters) -> CalibrationResult<f32> {
    let voltage = params.voltage(raw)?;
    log::debug!("GP2Y1014AU raw {} -> {:.3} V", raw, voltage);

    let density = finite(DUST_SLOPE_MG_M3_PER_V * voltage - DUST_OFFSET_MG_M3, "dust density")?;
    Ok(density.max(0.0))
}

/// Pulse the LED and sample the output
///
/// LED on, settle, sample, hold, LED off, recover. The LED is switched off
/// even when the conversion fails.
pub fn sample_with_led_pulse<B>(bus: &mut B, channel: u8, led_pin: u8) -> Result<u16, HardwareFault>
where
    B: AnalogInput + DigitalOutput + Delay,
{
    bus.set_level(led_pin, Level::Low)?;
    bus.delay_ms(DUST_LED_SETTLE_MS);

    let sample = nb::block!(bus.read_raw(channel));

    bus.delay_ms(DUST_LED_HOLD_MS);
    let released = bus.set_level(led_pin, Level::High);
    bus.delay_ms(DUST_LED_RECOVERY_MS);

    let raw = sample?;
    released?;
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingBus {
        events: std::vec::Vec<&'static str>,
        fail_read: bool,
    }

    impl AnalogInput for RecordingBus {
        fn read_raw(&mut self, _channel: u8) -> nb::Result<u16, HardwareFault> {
            self.events.push("read");
            if self.fail_read {
                Err(nb::Error::Other(HardwareFault("adc timeout")))
            } else {
                Ok(1200)
            }
        }
    }

    impl DigitalOutput for RecordingBus {
        fn set_level(&mut self, _pin: u8, level: Level) -> Result<(), HardwareFault> {
            self.events.push(match level {
                Level::Low => "led on",
                Level::High => "led off",
            });
            Ok(())
        }
    }

    impl Delay for RecordingBus {
        fn delay_ms(&mut self, _ms: u32) {
            self.events.push("wait");
        }
    }

    #[test]
    fn zero_sample_clamps_to_zero_density() {
        let params = CalibrationParameters::gp2y1014();
        assert_eq!(dust_density(0, &params), Ok(0.0));
    }

    #[test]
    fn density_follows_linear_fit() {
        let params = CalibrationParameters::gp2y1014();
        // 4095 counts = 3.3 V -> 0.17 * 3.3 - 0.1 = 0.461
        let density = dust_density(4095, &params).unwrap();
        assert!((density - 0.461).abs() < 1e-4);
    }

    #[test]
    fn led_pulse_sequence() {
        let mut bus = RecordingBus::default();
        let raw = sample_with_led_pulse(&mut bus, 34, 4).unwrap();

        assert_eq!(raw, 1200);
        assert_eq!(bus.events, ["led on", "wait", "read", "wait", "led off", "wait"]);
    }

    #[test]
    fn led_released_when_read_fails() {
        let mut bus = RecordingBus { fail_read: true, ..Default::default() };

        assert_eq!(sample_with_led_pulse(&mut bus, 34, 4), Err(HardwareFault("adc timeout")));
        assert!(bus.events.contains(&"led off"));
    }
}
