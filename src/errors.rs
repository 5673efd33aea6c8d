use thiserror::Error;
use crate::bus::i2c::I2CError;

/// Errors raised by a sensor while talking to it over the bus
#[derive(Error, Debug)]
pub enum SensorError {
    #[error("I2C transfer with sensor at {address:#04x} failed: {reason}")]
    Bus { address: u8, reason: String },

    #[error("Sensor at {address:#04x} initialization failed: {reason}")]
    InitError { address: u8, reason: String },

    #[error("Unsupported fusion driver: '{driver}'")]
    UnsupportedDriver { driver: String },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Startup errors that stop the streamer before the first sweep
#[derive(Error, Debug)]
pub enum StreamerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sensor(#[from] SensorError),

    #[error("Failed to open I2C bus '{path}': {source}")]
    BusOpen {
        path: String,
        #[source]
        source: I2CError,
    },

    #[error("Failed to open serial port '{path}': {source}")]
    SerialOpen {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Telemetry output failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type aliases for convenience
pub type SensorResult<T> = Result<T, SensorError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type StreamerResult<T> = Result<T, StreamerError>;
