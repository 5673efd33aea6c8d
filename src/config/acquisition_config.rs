use crate::errors::{ConfigError, ConfigResult};
use crate::fusion::{AccelRange, EngineSettings, GyroRange};
use crate::mux::{DEFAULT_MUX_ADDRESS, MAX_CHANNELS};
use serde::Deserialize;
use std::fs;

/// Root of `acquisition.toml`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcquisitionConfig {
    pub bus: BusSection,
    #[serde(default)]
    pub multiplexer: MultiplexerSection,
    pub sensor: SensorSection,
    #[serde(default)]
    pub output: OutputSection,
}

/// The I2C bus shared by the multiplexer and every sensor
#[derive(Debug, Clone, Deserialize)]
pub struct BusSection {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MultiplexerSection {
    #[serde(default = "default_mux_address")]
    pub address: u8,
    /// Number of populated ports, counted from port 0
    #[serde(default = "default_channels")]
    pub channels: u8,
}

impl Default for MultiplexerSection {
    fn default() -> Self {
        Self {
            address: default_mux_address(),
            channels: default_channels(),
        }
    }
}

/// Settings shared by every sensor behind the multiplexer
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorSection {
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default = "default_sensor_address")]
    pub address: u8,
    #[serde(default)]
    pub accel_range: AccelRange,
    #[serde(default)]
    pub gyro_range: GyroRange,
    #[serde(default = "default_rate_divider")]
    pub rate_divider: u8,
}

impl SensorSection {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            accel_range: self.accel_range,
            gyro_range: self.gyro_range,
            rate_divider: self.rate_divider,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    /// Serial device for telemetry; stdout when absent
    pub serial: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            serial: None,
            baud_rate: default_baud_rate(),
        }
    }
}

fn default_mux_address() -> u8 {
    DEFAULT_MUX_ADDRESS
}

fn default_channels() -> u8 {
    7
}

fn default_driver() -> String {
    "mpu6050_dmp".to_string()
}

fn default_sensor_address() -> u8 {
    0x68
}

fn default_rate_divider() -> u8 {
    EngineSettings::default().rate_divider
}

fn default_baud_rate() -> u32 {
    crate::bus::serial::DEFAULT_BAUD_RATE
}

impl AcquisitionConfig {
    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: AcquisitionConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.multiplexer.channels == 0 || self.multiplexer.channels > MAX_CHANNELS {
            return Err(ConfigError::InvalidValue {
                field: "multiplexer.channels".to_string(),
                reason: format!("must be 1..={}, got {}", MAX_CHANNELS, self.multiplexer.channels),
            });
        }
        if self.multiplexer.address == self.sensor.address {
            return Err(ConfigError::InvalidValue {
                field: "sensor.address".to_string(),
                reason: format!("collides with multiplexer address {:#04x}", self.multiplexer.address),
            });
        }
        if self.output.baud_rate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "output.baud_rate".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads config from TOML file
pub fn load_acquisition_config(path: &str) -> ConfigResult<AcquisitionConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    AcquisitionConfig::from_toml(&content)
}
