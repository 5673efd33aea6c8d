use super::{AccelRange, FusionEngine, GyroRange, PacketStatus};
use crate::bus::SharedBus;
use crate::errors::{SensorError, SensorResult};
use async_trait::async_trait;
use embedded_hal::i2c::I2c;
use linux_embedded_hal::Delay;
use mpu6050_dmp::accel::AccelFullScale;
use mpu6050_dmp::address::Address;
use mpu6050_dmp::gyro::GyroFullScale;
use mpu6050_dmp::sensor::Mpu6050;
use std::fmt::Debug;
use tracing::{debug, trace, warn};

/// Packet written by the embedded DMP image: quaternion, gyro and accel words
pub const DMP_PACKET_LEN: usize = 28;

/// Hardware FIFO depth; once it fills, packet boundaries are lost
const FIFO_SIZE: usize = 1024;

const WHO_AM_I: u8 = 0x75;
/// WHO_AM_I on a genuine MPU-6050, independent of the AD0 strap
const WHOAMI_MPU6050: u8 = 0x68;

impl From<AccelRange> for AccelFullScale {
    fn from(range: AccelRange) -> Self {
        match range {
            AccelRange::G2 => AccelFullScale::G2,
            AccelRange::G4 => AccelFullScale::G4,
            AccelRange::G8 => AccelFullScale::G8,
            AccelRange::G16 => AccelFullScale::G16,
        }
    }
}

impl From<GyroRange> for GyroFullScale {
    fn from(range: GyroRange) -> Self {
        match range {
            GyroRange::Dps250 => GyroFullScale::Deg250,
            GyroRange::Dps500 => GyroFullScale::Deg500,
            GyroRange::Dps1000 => GyroFullScale::Deg1000,
            GyroRange::Dps2000 => GyroFullScale::Deg2000,
        }
    }
}

fn bus_fault(address: u8, error: impl Debug) -> SensorError {
    SensorError::Bus {
        address,
        reason: format!("{:?}", error),
    }
}

/// MPU-6050 running the DMP image bundled with the `mpu6050-dmp` driver
pub struct Mpu6050Dmp<B: I2c> {
    address: u8,
    bus: SharedBus<B>,
    /// Present once `initialize` has woken the device
    sensor: Option<Mpu6050<SharedBus<B>>>,
    /// Loading the DMP resets the device, so this is applied again afterwards
    accel_range: AccelRange,
}

impl<B: I2c> Mpu6050Dmp<B> {
    pub fn new(address: u8, bus: SharedBus<B>) -> Self {
        Self {
            address,
            bus,
            sensor: None,
            accel_range: AccelRange::default(),
        }
    }

    fn sensor(&mut self) -> SensorResult<&mut Mpu6050<SharedBus<B>>> {
        let address = self.address;
        self.sensor.as_mut().ok_or_else(|| SensorError::InitError {
            address,
            reason: "device not initialized".to_string(),
        })
    }
}

#[async_trait]
impl<B> FusionEngine for Mpu6050Dmp<B>
where
    B: I2c + Send + 'static,
{
    fn packet_len(&self) -> usize {
        DMP_PACKET_LEN
    }

    async fn initialize(&mut self) -> SensorResult<()> {
        let mut who_am_i = [0u8; 1];
        self.bus
            .write_read(self.address, &[WHO_AM_I], &mut who_am_i)
            .map_err(|e| SensorError::InitError {
                address: self.address,
                reason: format!("no response: {:?}", e),
            })?;
        if who_am_i[0] != WHOAMI_MPU6050 {
            // Register-compatible clones report other IDs
            warn!("[mpu6050 {:#04x}] unexpected WHO_AM_I {:#04x}", self.address, who_am_i[0]);
        }

        let sensor = Mpu6050::new(self.bus.clone(), Address(self.address)).map_err(|e| {
            SensorError::InitError {
                address: self.address,
                reason: format!("{:?}", e),
            }
        })?;
        self.sensor = Some(sensor);
        debug!("[mpu6050 {:#04x}] awake", self.address);
        Ok(())
    }

    async fn set_accel_full_scale(&mut self, range: AccelRange) -> SensorResult<()> {
        let address = self.address;
        self.sensor()?
            .set_accel_full_scale(range.into())
            .map_err(|e| bus_fault(address, e))?;
        self.accel_range = range;
        Ok(())
    }

    async fn set_gyro_full_scale(&mut self, range: GyroRange) -> SensorResult<()> {
        let address = self.address;
        self.sensor()?
            .set_gyro_full_scale(range.into())
            .map_err(|e| bus_fault(address, e))
    }

    async fn load_dmp(&mut self) -> SensorResult<()> {
        let (address, accel_range) = (self.address, self.accel_range);
        let sensor = self.sensor()?;

        // Resets the device, uploads the image and leaves the gyro at 2000 °/s
        sensor.initialize_dmp(&mut Delay).map_err(|e| bus_fault(address, e))?;
        sensor
            .set_accel_full_scale(accel_range.into())
            .map_err(|e| bus_fault(address, e))?;

        debug!("[mpu6050 {:#04x}] DMP loaded", address);
        Ok(())
    }

    async fn set_rate(&mut self, divider: u8) -> SensorResult<()> {
        let address = self.address;
        self.sensor()?
            .set_sample_rate_divider(divider)
            .map_err(|e| bus_fault(address, e))
    }

    async fn set_dmp_enabled(&mut self, enabled: bool) -> SensorResult<()> {
        let address = self.address;
        let sensor = self.sensor()?;
        if enabled {
            sensor.enable_fifo().map_err(|e| bus_fault(address, e))?;
            sensor.reset_fifo().map_err(|e| bus_fault(address, e))?;
            sensor.enable_dmp().map_err(|e| bus_fault(address, e))
        } else {
            sensor.disable_dmp().map_err(|e| bus_fault(address, e))
        }
    }

    async fn current_packet(&mut self, packet: &mut [u8]) -> SensorResult<PacketStatus> {
        let address = self.address;
        let sensor = self.sensor()?;

        let count = sensor.get_fifo_count().map_err(|e| bus_fault(address, e))?;
        if count >= FIFO_SIZE {
            return Ok(PacketStatus::Overflow);
        }

        let complete = count / DMP_PACKET_LEN;
        if complete == 0 {
            return Ok(PacketStatus::Empty);
        }

        // Drop every complete packet except the newest
        let packet = &mut packet[..DMP_PACKET_LEN];
        if complete > 1 {
            trace!("[mpu6050 {:#04x}] dropping {} stale packet(s)", address, complete - 1);
        }
        for _ in 1..complete {
            sensor.read_fifo(packet).map_err(|e| bus_fault(address, e))?;
        }
        sensor.read_fifo(packet).map_err(|e| bus_fault(address, e))?;

        Ok(PacketStatus::Ready)
    }

    async fn reset_fifo(&mut self) -> SensorResult<()> {
        let address = self.address;
        self.sensor()?.reset_fifo().map_err(|e| bus_fault(address, e))
    }

    async fn acceleration(&mut self) -> SensorResult<[i16; 3]> {
        let address = self.address;
        let accel = self.sensor()?.accel().map_err(|e| bus_fault(address, e))?;
        Ok([accel.x(), accel.y(), accel.z()])
    }
}
