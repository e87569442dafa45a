//! Reading Aggregator
//!
//! ## Overview
//!
//! The aggregator owns the sensor bus and turns one pass over the configured
//! sensors into one [`CompositeRecord`]:
//!
//! ```text
//! for each sensor (configuration order)
//!     raw sample ──► calibrate ──► classify ──► record builder
//!          │              │
//!          └── error ─────┴──► required? ──► CycleFailure
//!                                   └─ no ──► warn, omit
//! ```
//!
//! Every sensor is attempted each cycle, even after an earlier one failed, so
//! a [`CycleFailure`] lists all broken sensors at once.
//!
//! ## Lifecycle
//!
//! 1. [`Aggregator::new`] checks the sensor table
//! 2. [`Aggregator::start`] brings sensors up and measures missing R0
//!    baselines. A sensor that fails here is excluded for the rest of the run
//! 3. [`Aggregator::acquire_cycle`] once per scheduler cycle
//! 4. [`Aggregator::release`] parks the dust sensor LED on shutdown

use heapless::Vec;

use crate::{
    calibration::{
        calibrate, estimate_r0, sample_with_led_pulse, CalibratedReading, CalibrationParameters,
        RawSample,
    },
    constants::{
        buffers::MAX_SENSORS, sensors::R0_WARMUP_SAMPLES, time::CLIMATE_SETTLE_MS,
    },
    errors::{CycleFailure, SensorError, SensorFailure, SetupError},
    record::{CompositeRecord, DeviceId, RecordBuilder},
    sensors::{SensorKind, SensorType},
    time::{MonotonicClock, TimeSource},
    traits::{Level, SensorBus},
    validators::ThresholdTable,
};

/// Wiring and calibration of one physical sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    /// Device type
    pub kind: SensorKind,
    /// ADC channel, or data pin for a climate sensor
    pub channel: u8,
    /// LED control pin (dust sensor only)
    pub led_pin: Option<u8>,
    /// Whether a failure of this sensor fails the whole cycle
    pub required: bool,
    /// Transfer-function parameters
    pub params: CalibrationParameters,
}

impl SensorConfig {
    /// Required sensor with factory calibration
    pub fn new(kind: SensorKind, channel: u8) -> Self {
        Self {
            kind,
            channel,
            led_pin: None,
            required: true,
            params: CalibrationParameters::defaults_for(kind),
        }
    }

    /// Set the LED control pin
    pub fn with_led_pin(mut self, pin: u8) -> Self {
        self.led_pin = Some(pin);
        self
    }

    /// Replace the calibration parameters
    pub fn with_params(mut self, params: CalibrationParameters) -> Self {
        self.params = params;
        self
    }

    /// Mark the sensor optional
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Bring-up state of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStatus {
    /// `start()` has not run yet
    Pending,
    /// Read every cycle
    Ready,
    /// Failed bring-up, excluded from acquisition
    Unavailable(&'static str),
}

#[derive(Debug)]
struct SensorSlot {
    config: SensorConfig,
    status: SensorStatus,
}

/// Owns the sensor bus and assembles one record per cycle
pub struct Aggregator<B, T> {
    bus: B,
    clock: MonotonicClock<T>,
    thresholds: ThresholdTable,
    sensors: Vec<SensorSlot, MAX_SENSORS>,
    started: bool,
}

impl<B: SensorBus, T: TimeSource> Aggregator<B, T> {
    /// Validate the sensor table and take ownership of the bus
    ///
    /// Each sensor type may be produced by one sensor only.
    pub fn new(
        bus: B,
        clock: T,
        thresholds: ThresholdTable,
        sensors: &[SensorConfig],
    ) -> Result<Self, SetupError> {
        if sensors.len() > MAX_SENSORS {
            return Err(SetupError::TooManySensors { max: MAX_SENSORS });
        }

        let mut slots: Vec<SensorSlot, MAX_SENSORS> = Vec::new();
        for config in sensors {
            for sensor_type in config.kind.produces() {
                let taken = slots
                    .iter()
                    .any(|slot| slot.config.kind.produces().contains(sensor_type));
                if taken {
                    return Err(SetupError::DuplicateSensorType(*sensor_type));
                }
            }
            slots
                .push(SensorSlot { config: *config, status: SensorStatus::Pending })
                .map_err(|_| SetupError::TooManySensors { max: MAX_SENSORS })?;
        }

        Ok(Self {
            bus,
            clock: MonotonicClock::new(clock),
            thresholds,
            sensors: slots,
            started: false,
        })
    }

    /// Bring every sensor up
    ///
    /// Analog sensors get their converter parameters checked, the dust LED is
    /// parked in its idle state and resistive sensors without a configured
    /// `r0` run the warm-up average. Any failure marks that sensor
    /// unavailable; nothing here aborts.
    pub fn start(&mut self) {
        if !self.clock.is_wall_clock() {
            log::warn!("Time source is not a wall clock, record timestamps are not calendar time");
        }

        for slot in self.sensors.iter_mut() {
            let status = match bring_up(&mut self.bus, &mut slot.config) {
                Ok(()) => {
                    log::info!("{} on channel {} ready", slot.config.kind, slot.config.channel);
                    SensorStatus::Ready
                }
                Err(reason) => {
                    if slot.config.required {
                        log::error!("{} unavailable: {}", slot.config.kind, reason);
                    } else {
                        log::warn!("{} (optional) unavailable: {}", slot.config.kind, reason);
                    }
                    SensorStatus::Unavailable(reason)
                }
            };
            slot.status = status;
        }
        self.started = true;
    }

    /// Read every sensor once and assemble a record
    ///
    /// Fails if any required sensor produced nothing. Runs [`start`](Self::start)
    /// first if it has not been called.
    pub fn acquire_cycle(&mut self, device_id: &DeviceId) -> Result<CompositeRecord, CycleFailure> {
        if !self.started {
            self.start();
        }

        let mut builder = RecordBuilder::new();
        let mut failures: Vec<SensorFailure, MAX_SENSORS> = Vec::new();

        for slot in self.sensors.iter() {
            let config = &slot.config;
            let result = match slot.status {
                SensorStatus::Unavailable(reason) => Err(SensorError::Unavailable { reason }),
                _ => read_sensor(&mut self.bus, config),
            };

            match result {
                Ok(readings) => {
                    for reading in readings {
                        let class = self.thresholds.classify(reading.sensor_type, reading.value);
                        builder.push(CalibratedReading { value: class.value, ..reading }, class.level);
                    }
                }
                Err(error) if config.required => {
                    log::error!("{} on channel {} failed: {}", config.kind, config.channel, error);
                    // One slot per sensor, same capacity
                    let _ = failures.push(SensorFailure {
                        kind: config.kind,
                        channel: config.channel,
                        error,
                    });
                }
                Err(error) => {
                    log::warn!("{} (optional) skipped: {}", config.kind, error);
                }
            }
        }

        if !failures.is_empty() {
            return Err(CycleFailure { failures });
        }

        Ok(builder.finish(device_id.clone(), self.clock.now()))
    }

    /// Drive every dust sensor LED to its idle (off) level
    pub fn release(&mut self) {
        for slot in self.sensors.iter() {
            if let (SensorKind::Gp2y1014, Some(pin)) = (slot.config.kind, slot.config.led_pin) {
                if let Err(fault) = self.bus.set_level(pin, Level::High) {
                    log::warn!("Failed to release LED pin {}: {}", pin, fault);
                }
            }
        }
    }

    /// Bring-up state of the sensor of a given kind
    pub fn sensor_status(&self, kind: SensorKind) -> Option<SensorStatus> {
        self.sensors
            .iter()
            .find(|slot| slot.config.kind == kind)
            .map(|slot| slot.status)
    }

    /// Current configuration of the sensor of a given kind (with measured `r0`)
    pub fn sensor_config(&self, kind: SensorKind) -> Option<&SensorConfig> {
        self.sensors
            .iter()
            .find(|slot| slot.config.kind == kind)
            .map(|slot| &slot.config)
    }

    /// Whether the given measurement is produced by a configured sensor
    pub fn produces(&self, sensor_type: SensorType) -> bool {
        self.sensors
            .iter()
            .any(|slot| slot.config.kind.produces().contains(&sensor_type))
    }

    /// Borrow the bus
    pub fn bus(&self) -> &B {
        &self.bus
    }
}

fn bring_up<B: SensorBus>(bus: &mut B, config: &mut SensorConfig) -> Result<(), &'static str> {
    match config.kind {
        SensorKind::Dht22 => Ok(()),
        SensorKind::Gp2y1014 => {
            config.params.adc_max().map_err(|_| "invalid ADC resolution")?;
            let pin = config.led_pin.ok_or("no LED pin configured")?;
            bus.set_level(pin, Level::High).map_err(|fault| fault.0)
        }
        SensorKind::Mq7 | SensorKind::Mq135 => {
            config.params.adc_max().map_err(|_| "invalid ADC resolution")?;
            if config.kind.needs_baseline() && config.params.r0.is_none() {
                let r0 = warm_up(bus, config)?;
                log::info!("{} R0 measured: {:.4}", config.kind, r0);
                config.params.r0 = Some(r0);
            }
            Ok(())
        }
    }
}

fn warm_up<B: SensorBus>(bus: &mut B, config: &SensorConfig) -> Result<f32, &'static str> {
    let mut samples: Vec<u16, R0_WARMUP_SAMPLES> = Vec::new();
    for _ in 0..R0_WARMUP_SAMPLES {
        let raw = nb::block!(bus.read_raw(config.channel)).map_err(|fault| fault.0)?;
        log::debug!("{} warm-up raw {}", config.kind, raw);
        let _ = samples.push(raw);
    }
    estimate_r0(samples, &config.params).map_err(|_| "baseline estimation failed")
}

fn read_sensor<B: SensorBus>(
    bus: &mut B,
    config: &SensorConfig,
) -> Result<Vec<CalibratedReading, 2>, SensorError> {
    let sample = match config.kind {
        SensorKind::Mq7 | SensorKind::Mq135 => {
            let raw = nb::block!(bus.read_raw(config.channel))?;
            log::debug!("{} raw {}", config.kind, raw);
            RawSample::Analog(raw)
        }
        SensorKind::Gp2y1014 => {
            let pin = config
                .led_pin
                .ok_or(SensorError::Unavailable { reason: "no LED pin configured" })?;
            let raw = sample_with_led_pulse(bus, config.channel, pin)?;
            log::debug!("{} raw {}", config.kind, raw);
            RawSample::Analog(raw)
        }
        SensorKind::Dht22 => {
            bus.delay_ms(CLIMATE_SETTLE_MS);
            let frame = bus.read_climate(config.channel)?.ok_or(SensorError::NoData)?;
            RawSample::Climate(frame)
        }
    };

    let mut readings = Vec::new();
    for sensor_type in config.kind.produces() {
        let reading = calibrate(config.kind, *sensor_type, sample, &config.params)?;
        let _ = readings.push(reading);
    }
    Ok(readings)
}
