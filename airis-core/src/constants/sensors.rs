//! Sensor Specifications and Calibration Coefficients
//!
//! Transfer-function constants for the sensors fitted to the AIRIS board.
//! The gas-sensor coefficients are power-law regressions
//! (`ppm = A × ratio^B`) fitted to the manufacturer response curves, the same
//! fits used by the MQUnifiedsensor Arduino library.

// ===== ANALOG FRONT END =====

/// ADC resolution in bits (ESP32 ADC1, 11 dB attenuation).
pub const ADC_BIT_RESOLUTION: u8 = 12;

/// Full-scale ADC count for [`ADC_BIT_RESOLUTION`].
pub const ADC_MAX: u16 = (1 << ADC_BIT_RESOLUTION) - 1;

/// Supply voltage of the MQ-series heater/load circuit (V).
pub const MQ_SUPPLY_V: f32 = 5.0;

/// ADC reference voltage used by the dust sensor divider (V).
pub const DUST_VREF_V: f32 = 3.3;

// ===== MQ-7 (CARBON MONOXIDE) =====

/// MQ-7 regression coefficient A.
pub const MQ7_A: f32 = 99.042;

/// MQ-7 regression exponent B.
pub const MQ7_B: f32 = -1.518;

/// MQ-7 Rs/R0 ratio in clean air (datasheet).
pub const MQ7_RATIO_CLEAN_AIR: f32 = 27.5;

// ===== MQ-135 (CO2 PROXY) =====

/// MQ-135 regression coefficient A (CO2 curve).
pub const MQ135_A: f32 = 110.47;

/// MQ-135 regression exponent B (CO2 curve).
pub const MQ135_B: f32 = -2.862;

/// MQ-135 Rs/R0 ratio in clean air (datasheet).
pub const MQ135_RATIO_CLEAN_AIR: f32 = 3.6;

/// Ambient outdoor CO2 concentration added to the MQ-135 regression output (ppm).
///
/// The regression gives the concentration above background.
pub const CO2_BASELINE_PPM: f32 = 400.0;

// ===== GP2Y1014AU (DUST) =====

/// Slope of the dust density fit (mg/m³ per volt).
///
/// Source: Sharp GP2Y1010/1014 application note linear approximation
pub const DUST_SLOPE_MG_M3_PER_V: f32 = 0.17;

/// Offset of the dust density fit (mg/m³), subtracted after the slope.
pub const DUST_OFFSET_MG_M3: f32 = 0.1;

// ===== CALIBRATION PROCEDURE =====

/// Number of consecutive samples averaged to establish R0 at start-up.
pub const R0_WARMUP_SAMPLES: usize = 10;

/// Decimal places kept in reported values.
pub const REPORTING_DECIMALS: u8 = 2;
