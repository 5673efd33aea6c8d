use async_trait::async_trait;
use embedded_hal::i2c::I2c;
use mpu6050_dmp::quaternion::Quaternion;
use serde::Deserialize;
use crate::bus::SharedBus;
use crate::errors::{SensorError, SensorResult};

#[cfg(feature = "mpu6050_dmp")]
pub mod mpu6050;

#[cfg(test)]
pub mod scripted;

/// Bytes at the head of every DMP packet holding the (w, x, y, z) quaternion
pub const QUATERNION_LEN: usize = 16;

/// Accelerometer full-scale range
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccelRange {
    #[default]
    G2,
    G4,
    G8,
    G16,
}

impl AccelRange {
    /// Magnitude in g that a full-scale raw reading represents
    pub fn full_scale_g(self) -> f32 {
        match self {
            AccelRange::G2 => 2.0,
            AccelRange::G4 => 4.0,
            AccelRange::G8 => 8.0,
            AccelRange::G16 => 16.0,
        }
    }
}

/// Gyroscope full-scale range. The DMP image integrates at 2000 °/s.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GyroRange {
    Dps250,
    Dps500,
    Dps1000,
    #[default]
    Dps2000,
}

/// Result of asking the fusion engine for its newest output packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketStatus {
    /// A complete packet was copied into the caller's buffer
    Ready,
    /// Fewer bytes than one packet are queued
    Empty,
    /// The output queue filled up and its contents can no longer be framed
    Overflow,
}

/// Euler-style angles in radians
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct YawPitchRoll {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl YawPitchRoll {
    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }
}

/// Normalized orientation quaternion at the head of a DMP packet
pub fn quaternion_from_packet(packet: &[u8]) -> Option<Quaternion> {
    let quaternion = Quaternion::from_bytes(packet.get(..QUATERNION_LEN)?)?;
    Some(quaternion.normalize())
}

/// Yaw, pitch and roll of a DMP packet.
///
/// The angles come from the packet's quaternion and the gravity vector it
/// implies. `None` when the packet is too short to hold a quaternion.
pub fn orientation_from_packet(packet: &[u8]) -> Option<YawPitchRoll> {
    let angles = mpu6050_dmp::yaw_pitch_roll::YawPitchRoll::from(quaternion_from_packet(packet)?);
    Some(YawPitchRoll {
        yaw: angles.yaw,
        pitch: angles.pitch,
        roll: angles.roll,
    })
}

/// Settings applied to every engine during initialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub accel_range: AccelRange,
    pub gyro_range: GyroRange,
    /// Sample rate divider; 3 gives the 50 Hz DMP output the readers expect
    pub rate_divider: u8,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            accel_range: AccelRange::G2,
            gyro_range: GyroRange::Dps2000,
            rate_divider: 3,
        }
    }
}

/// On-chip motion processor producing fused orientation packets.
///
/// Every call assumes the multiplexer already routes the bus to this engine's
/// device. The engine keeps no per-tick state of its own: the caller owns the
/// packet buffer.
#[async_trait]
pub trait FusionEngine: Send {
    /// Size in bytes of one output packet
    fn packet_len(&self) -> usize;

    async fn initialize(&mut self) -> SensorResult<()>;
    async fn set_accel_full_scale(&mut self, range: AccelRange) -> SensorResult<()>;
    async fn set_gyro_full_scale(&mut self, range: GyroRange) -> SensorResult<()>;
    /// Upload the motion processor program and its configuration
    async fn load_dmp(&mut self) -> SensorResult<()>;
    async fn set_rate(&mut self, divider: u8) -> SensorResult<()>;
    async fn set_dmp_enabled(&mut self, enabled: bool) -> SensorResult<()>;

    /// Copy the newest complete packet into `packet` (`packet_len()` bytes)
    async fn current_packet(&mut self, packet: &mut [u8]) -> SensorResult<PacketStatus>;
    async fn reset_fifo(&mut self) -> SensorResult<()>;

    /// Raw accelerometer registers in the order the device reports them (x, y, z)
    async fn acceleration(&mut self) -> SensorResult<[i16; 3]>;
}

/// Create the fusion engine named by `driver` for a device at `address`
#[cfg_attr(not(feature = "mpu6050_dmp"), allow(unused_variables))]
pub fn create_fusion_engine<B>(
    driver: &str,
    address: u8,
    bus: SharedBus<B>,
) -> SensorResult<Box<dyn FusionEngine>>
where
    B: I2c + Send + 'static,
{
    match driver {
        #[cfg(feature = "mpu6050_dmp")]
        "mpu6050_dmp" => Ok(Box::new(mpu6050::Mpu6050Dmp::new(address, bus))),
        _ => Err(SensorError::UnsupportedDriver { driver: driver.to_string() }),
    }
}
