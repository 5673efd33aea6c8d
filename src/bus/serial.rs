use std::io;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

/// Baud rate the downstream readers expect unless configured otherwise
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial port wrapper carrying the telemetry text stream
pub struct SerialBus {
    port: SerialStream,
    /// Port path - kept for log messages
    path: String,
}

impl SerialBus {
    pub fn new_with_baud(path: &str, baud_rate: u32) -> io::Result<Self> {
        debug!("[SerialBus] opening {} at {} baud", path, baud_rate);
        let port = tokio_serial::new(path, baud_rate).open_native_async()?;
        info!("[SerialBus] {} open", path);

        Ok(Self {
            port,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Consume self and return the underlying SerialStream
    pub fn into_stream(self) -> SerialStream {
        self.port
    }
}
