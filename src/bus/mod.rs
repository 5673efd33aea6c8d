pub mod i2c;
pub mod serial;

#[cfg(test)]
pub mod mock;

pub use i2c::{open_bus, I2CDevice, I2CError, SharedBus};
