//! Resistive gas sensors (MQ series)
//!
//! The sensing element is a tin-oxide resistor in series with a load
//! resistor. The ADC sees the load-side voltage, so the element resistance
//! follows from the divider equation. Concentration comes from a power-law
//! fit of the datasheet sensitivity curve.

use libm::powf;

use super::{finite, CalibrationParameters};
use crate::{
    constants::sensors::CO2_BASELINE_PPM,
    errors::{CalibrationError, CalibrationResult},
};

/// Element resistance relative to the load resistor, `(Vsupply − V) / V`
pub fn sensor_resistance(voltage: f32, supply: f32) -> CalibrationResult<f32> {
    if voltage == 0.0 {
        return Err(CalibrationError::ZeroVoltage);
    }
    finite((supply - voltage) / voltage, "sensor resistance")
}

/// `A × base^B`, rejecting non-finite results (e.g. `0^B` with `B < 0`)
fn power_law(a: f32, base: f32, b: f32) -> CalibrationResult<f32> {
    finite(a * powf(base, b), "power law")
}

/// Carbon monoxide concentration from an MQ-7 sample (ppm)
///
/// Needs the clean-air baseline `r0`.
pub fn co_ppm(raw: u16, params: &CalibrationParameters) -> CalibrationResult<f32> {
    let r0 = match params.r0 {
        Some(r0) if r0.is_finite() && r0 > 0.0 => r0,
        _ => return Err(CalibrationError::MissingParameter { name: "r0" }),
    };

    let voltage = params.voltage(raw)?;
    log::debug!("MQ7 raw {} -> {:.3} V", raw, voltage);

    let rs = sensor_resistance(voltage, params.voltage_resolution)?;
    let ratio = finite(rs / r0, "rs/r0 ratio")?;

    power_law(params.a, ratio, params.b)
}

/// CO2 concentration from an MQ-135 sample (ppm), including the ambient baseline
pub fn co2_ppm(raw: u16, params: &CalibrationParameters) -> CalibrationResult<f32> {
    if !(params.ratio_clean_air.is_finite() && params.ratio_clean_air > 0.0) {
        return Err(CalibrationError::MissingParameter { name: "ratio_clean_air" });
    }

    let voltage = params.voltage(raw)?;
    log::debug!("MQ135 raw {} -> {:.3} V", raw, voltage);

    if voltage == 0.0 {
        return Err(CalibrationError::ZeroVoltage);
    }
    let ratio = finite(params.voltage_resolution / voltage - 1.0, "rs/r0 ratio")?;

    let ppm = power_law(params.a, ratio / params.ratio_clean_air, params.b)?;
    finite(ppm + CO2_BASELINE_PPM, "co2 baseline")
}

/// Clean-air baseline from warm-up samples
///
/// Averages `Rs / ratio_clean_air` over every sample. A single degenerate
/// sample fails the whole estimate; a warm-up with no samples is a missing
/// parameter.
pub fn estimate_r0<I>(samples: I, params: &CalibrationParameters) -> CalibrationResult<f32>
where
    I: IntoIterator<Item = u16>,
{
    if !(params.ratio_clean_air.is_finite() && params.ratio_clean_air > 0.0) {
        return Err(CalibrationError::MissingParameter { name: "ratio_clean_air" });
    }

    let mut sum = 0.0f32;
    let mut count = 0usize;
    for raw in samples {
        let voltage = params.voltage(raw)?;
        let rs = sensor_resistance(voltage, params.voltage_resolution)?;
        sum += rs / params.ratio_clean_air;
        count += 1;
    }

    if count == 0 {
        return Err(CalibrationError::MissingParameter { name: "r0" });
    }

    let r0 = finite(sum / count as f32, "r0 average")?;
    if r0 <= 0.0 {
        // Saturated divider: V == Vsupply gives Rs = 0
        return Err(CalibrationError::NonFinite { stage: "r0 average" });
    }
    Ok(r0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn co_reference_sample() {
        let params = CalibrationParameters::mq7().with_r0(27.5);
        let ppm = co_ppm(2048, &params).unwrap();

        // Rs ≈ 1.0, ratio ≈ 0.0363: far above the 0–100 ppm reporting range
        assert!(ppm.is_finite());
        assert!(ppm > 100.0);
    }

    #[test]
    fn co_without_baseline_fails() {
        let params = CalibrationParameters::mq7();
        assert_eq!(
            co_ppm(2048, &params),
            Err(CalibrationError::MissingParameter { name: "r0" })
        );
    }

    #[test]
    fn zero_voltage_is_an_error_not_zero() {
        let mq7 = CalibrationParameters::mq7().with_r0(1.0);
        assert_eq!(co_ppm(0, &mq7), Err(CalibrationError::ZeroVoltage));
        assert_eq!(co2_ppm(0, &CalibrationParameters::mq135()), Err(CalibrationError::ZeroVoltage));
    }

    #[test]
    fn saturated_divider_is_non_finite() {
        // V == Vsupply: Rs = 0, 0^B with B < 0 diverges
        let params = CalibrationParameters::mq7().with_r0(1.0);
        assert!(matches!(co_ppm(4095, &params), Err(CalibrationError::NonFinite { .. })));
        assert!(matches!(
            co2_ppm(4095, &CalibrationParameters::mq135()),
            Err(CalibrationError::NonFinite { .. })
        ));
    }

    #[test]
    fn co2_includes_ambient_baseline() {
        let params = CalibrationParameters::mq135();
        let ppm = co2_ppm(3000, &params).unwrap();
        assert!(ppm > CO2_BASELINE_PPM);
    }

    #[test]
    fn families_normalise_differently() {
        // Same sample and coefficients: MQ-7 divides by R0, MQ-135 by the clean-air ratio
        let mq7 = CalibrationParameters { r0: Some(1.0), ..CalibrationParameters::mq135() };
        let co2 = co2_ppm(1500, &CalibrationParameters::mq135()).unwrap() - CO2_BASELINE_PPM;
        let co = co_ppm(1500, &mq7).unwrap();
        assert!((co - co2).abs() > 1e-3);
    }

    #[test]
    fn r0_is_mean_of_scaled_resistance() {
        let params = CalibrationParameters::mq7();
        let r0 = estimate_r0([2048u16; 10], &params).unwrap();

        let rs = sensor_resistance(params.voltage(2048).unwrap(), 5.0).unwrap();
        assert!((r0 - rs / 27.5).abs() < 1e-6);
    }

    #[test]
    fn r0_warmup_rejects_degenerate_sample() {
        let params = CalibrationParameters::mq7();
        let mut samples = [2000u16; 10];
        samples[4] = 0;
        assert_eq!(estimate_r0(samples, &params), Err(CalibrationError::ZeroVoltage));
        assert!(estimate_r0(core::iter::empty(), &params).is_err());
    }
}
