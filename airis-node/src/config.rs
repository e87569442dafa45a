//! Node configuration
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults (firmware wiring, `default` profile)
//! 2. `airis.toml` in the working directory, or the file given with `--config`
//! 3. `AIRIS_*` environment variables, also read from `.env`
//!    (`AIRIS_SINK__BASE_URL`, `AIRIS_DEVICE__PROFILE`, ...)
//! 4. command-line flags, applied by the binary
//!
//! A parsed [`NodeConfig`] is resolved once into a [`NodeContext`]: the
//! profile merged with local overrides, thresholds validated, calibration
//! patched, and the sensor table built. Nothing downstream reads the raw
//! configuration again.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use airis_connectors::http::HttpConfig;
use airis_core::{record::device_id, DeviceId, SensorConfig, SensorKind, ThresholdTable};
use airis_schemas::{profiles, CalibrationOverride, CalibrationSet, SchemaError, ThresholdOverrides};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{NodeError, Result};

/// Default configuration file stem, looked up in the working directory
pub const DEFAULT_CONFIG_NAME: &str = "airis";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "AIRIS";

/// Raw node configuration as read from file and environment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// `[device]`
    pub device: DeviceConfig,
    /// `[sampling]`
    pub sampling: SamplingConfig,
    /// `[sink]`
    pub sink: SinkConfig,
    /// `[spill]`
    pub spill: SpillConfig,
    /// `[calibration]`
    pub calibration: CalibrationConfig,
    /// Local threshold overrides, applied on top of the profile
    pub thresholds: ThresholdOverrides,
    /// `[[sensors]]` wiring; the reference board when empty
    pub sensors: Vec<WiringConfig>,
}

/// Identity and deployment profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Falls back to the profile's id, then to a random `AIRIS_ESP32_*` id
    pub id: Option<String>,
    /// Installation location attached to every payload
    pub location: Option<String>,
    /// Deployment profile name, `default` when unset
    pub profile: Option<String>,
}

/// Sampling cadence
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Seconds between successful deliveries; the profile decides when unset
    pub interval_seconds: Option<u64>,
}

/// Datastore connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Datastore root URL; without it records are only logged
    pub base_url: Option<String>,
    /// Service key, sent as both `apikey` and bearer token
    pub api_key: Option<String>,
    /// Per-attempt budget
    pub timeout_seconds: u64,
    /// Table path below the base URL; the readings table when unset
    pub endpoint: Option<String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_seconds: 10,
            endpoint: None,
        }
    }
}

/// Where undeliverable records go
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpillConfig {
    /// Created on first spill
    pub directory: PathBuf,
}

impl Default for SpillConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("spill"),
        }
    }
}

/// Calibration corrections on top of the factory coefficients
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Named production-batch corrections, applied in order
    pub batches: Vec<String>,
    /// Per-device coefficient overrides keyed by device name (`mq7`, ...)
    pub overrides: BTreeMap<String, CalibrationOverride>,
}

/// Where one sensor is wired
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WiringConfig {
    /// Device name: `mq7`, `mq135`, `gp2y1014` or `dht22`
    pub kind: String,
    /// ADC channel, or data pin for the climate sensor
    pub channel: u8,
    /// Dust sensor LED pin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub led_pin: Option<u8>,
    /// A failing required sensor suppresses the whole record
    #[serde(default = "required_by_default")]
    pub required: bool,
    /// Fixed clean-air baseline; skips the warm-up
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r0: Option<f32>,
}

fn required_by_default() -> bool {
    true
}

impl WiringConfig {
    fn new(kind: SensorKind, channel: u8) -> Self {
        Self {
            kind: kind.config_name().to_string(),
            channel,
            led_pin: None,
            required: true,
            r0: None,
        }
    }

    /// ESP32 reference board wiring
    pub fn firmware_defaults() -> Vec<Self> {
        vec![
            Self::new(SensorKind::Mq7, 32),
            Self::new(SensorKind::Mq135, 35),
            Self {
                led_pin: Some(4),
                ..Self::new(SensorKind::Gp2y1014, 34)
            },
            Self::new(SensorKind::Dht22, 27),
        ]
    }
}

/// Everything the node needs at run time, resolved from [`NodeConfig`]
#[derive(Debug, Clone)]
pub struct NodeContext {
    /// Reported in every record
    pub device_id: DeviceId,
    /// Attached to every payload when set
    pub location: Option<String>,
    /// Name of the resolved profile
    pub profile: &'static str,
    /// Time between successful deliveries
    pub interval: Duration,
    /// Profile thresholds with local overrides applied
    pub thresholds: ThresholdTable,
    /// Sensor table with calibration applied
    pub sensors: Vec<SensorConfig>,
    /// `None` when no sink URL is configured
    pub http: Option<HttpConfig>,
    /// Spill directory
    pub spill_dir: PathBuf,
}

impl NodeConfig {
    /// Read `.env`, the config file and `AIRIS_*` variables
    ///
    /// Without an explicit `path`, `airis.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(path) => ::config::File::from(path).required(true),
            None => ::config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = ::config::Config::builder()
            .add_source(file)
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: NodeConfig = settings.try_deserialize()?;
        log::debug!(
            "Loaded configuration: profile {:?}, {} wiring entries, sink {}",
            config.device.profile,
            config.sensors.len(),
            if config.sink.base_url.is_some() { "configured" } else { "none" }
        );
        Ok(config)
    }

    /// Resolve profile, thresholds, calibration and wiring
    pub fn into_context(self) -> Result<NodeContext> {
        let profile_name = self.device.profile.as_deref().unwrap_or("default");
        let profile = profiles::profile(profile_name)?;

        let mut thresholds = profile.thresholds()?;
        thresholds.apply_overrides(&self.thresholds)?;
        let thresholds = thresholds.to_table()?;

        let mut calibration = CalibrationSet::factory();
        for batch in &self.calibration.batches {
            calibration = calibration.with_batch(batch)?;
        }
        for (name, patch) in &self.calibration.overrides {
            let kind = SensorKind::from_name(name)
                .ok_or_else(|| SchemaError::UnknownSensorKind(name.clone()))?;
            calibration.apply(kind, patch)?;
        }

        let wiring = if self.sensors.is_empty() {
            WiringConfig::firmware_defaults()
        } else {
            self.sensors
        };
        let sensors = wiring
            .iter()
            .map(|w| sensor_config(w, &calibration))
            .collect::<Result<Vec<_>>>()?;

        let id = match self.device.id.or_else(|| profile.device_id.map(str::to_string)) {
            Some(id) => id,
            None => generated_device_id(),
        };
        let device_id = device_id(&id)?;

        let location = self.device.location.or_else(|| profile.location.map(str::to_string));

        let interval_s = self.sampling.interval_seconds.unwrap_or(profile.sampling_interval_s);
        if interval_s == 0 {
            return Err(NodeError::InvalidConfig(
                "sampling interval must be at least one second".into(),
            ));
        }

        let http = self.sink.base_url.map(|base_url| {
            let mut http = HttpConfig::new(base_url).timeout_secs(self.sink.timeout_seconds);
            if let Some(endpoint) = self.sink.endpoint {
                http = http.endpoint(endpoint);
            }
            if let Some(key) = self.sink.api_key {
                http = http.service_key(key);
            }
            http
        });

        log::info!(
            "Node {} using profile '{}', {} sensor(s), interval {}s",
            device_id,
            profile.name,
            sensors.len(),
            interval_s
        );

        Ok(NodeContext {
            device_id,
            location,
            profile: profile.name,
            interval: Duration::from_secs(interval_s),
            thresholds,
            sensors,
            http,
            spill_dir: self.spill.directory,
        })
    }
}

fn sensor_config(wiring: &WiringConfig, calibration: &CalibrationSet) -> Result<SensorConfig> {
    let kind = SensorKind::from_name(&wiring.kind)
        .ok_or_else(|| SchemaError::UnknownSensorKind(wiring.kind.clone()))?;

    let mut params = calibration.get(kind);
    if let Some(r0) = wiring.r0 {
        if !(r0.is_finite() && r0 > 0.0) {
            return Err(NodeError::InvalidConfig(format!("{} r0 must be positive", kind)));
        }
        params = params.with_r0(r0);
    }

    let mut config = SensorConfig::new(kind, wiring.channel).with_params(params);
    if let Some(pin) = wiring.led_pin {
        config = config.with_led_pin(pin);
    }
    if !wiring.required {
        config = config.optional();
    }
    Ok(config)
}

/// `AIRIS_ESP32_` followed by eight random hex digits
fn generated_device_id() -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("AIRIS_ESP32_{:08X}", suffix)
}
