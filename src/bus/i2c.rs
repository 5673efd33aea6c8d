use embedded_hal::i2c::{ErrorType, I2c, Operation};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// Re-export linux-embedded-hal types directly
pub use i2cdev::linux::LinuxI2CError as I2CError;
pub use linux_embedded_hal::I2cdev as I2CDevice;

/// Cloneable handle on one physical I2C bus.
///
/// The multiplexer and every sensor driver hold a handle on the same bus.
/// Each transfer takes the lock for its whole duration, and the acquisition
/// cycle drives one device at a time, so transfers never interleave.
pub struct SharedBus<B> {
    inner: Arc<Mutex<B>>,
}

impl<B> SharedBus<B> {
    pub fn new(bus: B) -> Self {
        Self {
            inner: Arc::new(Mutex::new(bus)),
        }
    }

    /// Exclusive access to the underlying bus
    pub fn lock(&self) -> MutexGuard<'_, B> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B> Clone for SharedBus<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B> fmt::Debug for SharedBus<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBus")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}

impl<B: ErrorType> ErrorType for SharedBus<B> {
    type Error = B::Error;
}

impl<B: I2c> I2c for SharedBus<B> {
    fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        self.lock().read(address, read)
    }

    fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        self.lock().write(address, write)
    }

    fn write_read(&mut self, address: u8, write: &[u8], read: &mut [u8]) -> Result<(), Self::Error> {
        self.lock().write_read(address, write, read)
    }

    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        self.lock().transaction(address, operations)
    }
}

/// Open the I2C character device at `path` as a shared bus
pub fn open_bus(path: &str) -> Result<SharedBus<I2CDevice>, I2CError> {
    let device = I2CDevice::new(path)?;
    Ok(SharedBus::new(device))
}
