use embedded_hal::i2c::I2c;
use tracing::{debug, trace};

/// Default address of a TCA9548A-style multiplexer with A0..A2 grounded
pub const DEFAULT_MUX_ADDRESS: u8 = 0x70;

/// Number of downstream ports the multiplexer's one-hot control byte can address
pub const MAX_CHANNELS: u8 = 8;

/// Routes bus traffic to one multiplexer port at a time.
///
/// The port index doubles as the hardware channel: port `n` is selected by
/// writing the mask `1 << n` to the control register.
#[derive(Debug, Clone, Copy)]
pub struct ChannelSelector {
    address: u8,
}

impl ChannelSelector {
    pub fn new(address: u8) -> Self {
        Self { address }
    }

    /// One-hot control byte for `port`, or `None` when the port does not exist
    pub fn channel_mask(port: u8) -> Option<u8> {
        (port < MAX_CHANNELS).then(|| 1u8 << port)
    }

    /// Route subsequent bus traffic to `port`.
    ///
    /// Ports at or above [`MAX_CHANNELS`] are ignored without touching the bus,
    /// leaving the previously selected channel active. Bus failures are not
    /// reported to the caller.
    pub fn select<B: I2c>(&self, bus: &mut B, port: u8) {
        let Some(mask) = Self::channel_mask(port) else {
            trace!("[mux] ignoring select of out-of-range port {}", port);
            return;
        };

        if let Err(e) = bus.write(self.address, &[mask]) {
            debug!("[mux] select port {} failed: {:?}", port, e);
        }
    }
}

impl Default for ChannelSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MUX_ADDRESS)
    }
}
