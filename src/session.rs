use crate::errors::SensorResult;
use crate::fusion::{orientation_from_packet, EngineSettings, FusionEngine, PacketStatus, YawPitchRoll};
use tracing::{debug, info, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
}

/// One decoded reading from a sensor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationSample {
    /// Raw accelerometer registers, device order (x, y, z)
    pub accel_raw: [i16; 3],
    /// Angles in radians
    pub angles: YawPitchRoll,
}

/// What one read attempt produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReadOutcome {
    Record(OrientationSample),
    /// No complete packet this tick; the FIFO has been reset
    NoRecord,
}

/// Per-port state for one IMU behind the multiplexer.
///
/// Lives for the whole process so the fusion engine's integration state
/// carries over from tick to tick. Nothing else does: a missed packet is
/// dropped, never queued for the next sweep.
pub struct SensorSession {
    port: u8,
    settings: EngineSettings,
    engine: Box<dyn FusionEngine>,
    /// FIFO packet buffer, sized once from the engine's packet length
    packet: Box<[u8]>,
    state: SessionState,
    last_sample: Option<OrientationSample>,
}

impl SensorSession {
    pub fn new(port: u8, engine: Box<dyn FusionEngine>, settings: EngineSettings) -> Self {
        let packet = vec![0u8; engine.packet_len()].into_boxed_slice();
        Self {
            port,
            settings,
            engine,
            packet,
            state: SessionState::Uninitialized,
            last_sample: None,
        }
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Most recent reading that produced a record
    pub fn last_sample(&self) -> Option<&OrientationSample> {
        self.last_sample.as_ref()
    }

    /// Bring the sensor up. The multiplexer must already route to this port.
    pub async fn initialize(&mut self) -> SensorResult<()> {
        let settings = self.settings;
        self.engine.initialize().await?;
        self.engine.set_accel_full_scale(settings.accel_range).await?;
        self.engine.set_gyro_full_scale(settings.gyro_range).await?;
        self.engine.load_dmp().await?;
        self.engine.set_rate(settings.rate_divider).await?;
        self.engine.set_dmp_enabled(true).await?;

        self.state = SessionState::Ready;
        info!("[session {}] ready", self.port);
        Ok(())
    }

    /// Attempt one read. The multiplexer must already route to this port.
    ///
    /// Never blocks waiting for data: when the engine has no complete packet
    /// the FIFO is reset and `NoRecord` is returned straight away. A fetch
    /// that fails part way through also resets the FIFO, so the next tick
    /// starts on a packet boundary.
    pub async fn read(&mut self) -> SensorResult<ReadOutcome> {
        if self.state != SessionState::Ready {
            return Ok(ReadOutcome::NoRecord);
        }

        let status = match self.engine.current_packet(&mut self.packet).await {
            Ok(status) => status,
            Err(e) => {
                if let Err(reset) = self.engine.reset_fifo().await {
                    debug!("[session {}] FIFO reset after failed read also failed: {}", self.port, reset);
                }
                return Err(e);
            }
        };

        let angles = match status {
            PacketStatus::Ready => orientation_from_packet(&self.packet).filter(YawPitchRoll::is_finite),
            PacketStatus::Empty | PacketStatus::Overflow => None,
        };

        let Some(angles) = angles else {
            trace!("[session {}] no usable packet ({:?})", self.port, status);
            self.engine.reset_fifo().await?;
            return Ok(ReadOutcome::NoRecord);
        };

        let accel_raw = self.engine.acceleration().await?;

        let sample = OrientationSample { accel_raw, angles };
        self.last_sample = Some(sample);
        Ok(ReadOutcome::Record(sample))
    }
}

impl std::fmt::Debug for SensorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SensorSession")
            .field("port", &self.port)
            .field("state", &self.state)
            .field("packet_len", &self.packet.len())
            .finish()
    }
}
