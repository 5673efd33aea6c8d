use crate::errors::{ConfigError, ConfigResult};
use crate::fusion::{EngineSettings, FusionEngine};
use crate::mux::{ChannelSelector, MAX_CHANNELS};
use crate::session::{ReadOutcome, SensorSession, SessionState};
use crate::telemetry::TelemetryEmitter;
use std::convert::Infallible;
use embedded_hal::i2c::I2c;
use tokio::io::AsyncWrite;
use tracing::{debug, info, trace, warn};

/// Tally of one pass over every port
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Ports that produced a record
    pub emitted: usize,
    /// Ports with no complete packet this tick
    pub skipped: usize,
    /// Ports whose read hit a bus error
    pub failed: usize,
}

/// Polls every sensor behind the multiplexer, in port order, forever.
///
/// Sessions run one at a time on a single task, so the channel picked by the
/// selector stays routed for the whole of that port's read.
pub struct AcquisitionCycle<B, W> {
    bus: B,
    selector: ChannelSelector,
    sessions: Vec<SensorSession>,
    emitter: TelemetryEmitter<W>,
    sweeps: u64,
}

impl<B: I2c, W: AsyncWrite + Unpin> AcquisitionCycle<B, W> {
    /// One session per engine; the engine's position is its port index.
    pub fn new(
        bus: B,
        selector: ChannelSelector,
        engines: Vec<Box<dyn FusionEngine>>,
        settings: EngineSettings,
        emitter: TelemetryEmitter<W>,
    ) -> ConfigResult<Self> {
        if engines.is_empty() || engines.len() > MAX_CHANNELS as usize {
            return Err(ConfigError::InvalidValue {
                field: "multiplexer.channels".to_string(),
                reason: format!("must be 1..={}, got {}", MAX_CHANNELS, engines.len()),
            });
        }

        let sessions = engines
            .into_iter()
            .enumerate()
            .map(|(port, engine)| SensorSession::new(port as u8, engine, settings))
            .collect();

        Ok(Self {
            bus,
            selector,
            sessions,
            emitter,
            sweeps: 0,
        })
    }

    pub fn sessions(&self) -> &[SensorSession] {
        &self.sessions
    }

    pub fn emitter(&self) -> &TelemetryEmitter<W> {
        &self.emitter
    }

    pub fn sweeps(&self) -> u64 {
        self.sweeps
    }

    /// Select and initialize every port in turn, announcing each on the
    /// telemetry stream first. A sensor that fails to come up stays
    /// uninitialized and never blocks the others.
    ///
    /// Returns the number of sessions that reached Ready.
    pub async fn initialize(&mut self) -> std::io::Result<usize> {
        for session in self.sessions.iter_mut() {
            let port = session.port();
            self.selector.select(&mut self.bus, port);
            self.emitter.announce_port(port).await?;

            if let Err(e) = session.initialize().await {
                warn!("[session {}] initialization failed: {}", port, e);
            }
        }

        let ready = self
            .sessions
            .iter()
            .filter(|s| s.state() == SessionState::Ready)
            .count();
        info!("[acquisition] {}/{} sensor(s) ready", ready, self.sessions.len());
        Ok(ready)
    }

    /// Visit every port once in ascending order.
    ///
    /// A port without data, or whose read fails, is skipped immediately; only
    /// a failure to write telemetry ends the sweep early.
    pub async fn sweep(&mut self) -> std::io::Result<SweepReport> {
        let mut report = SweepReport::default();

        for session in self.sessions.iter_mut() {
            let port = session.port();
            self.selector.select(&mut self.bus, port);

            match session.read().await {
                Ok(ReadOutcome::Record(sample)) => {
                    self.emitter.emit(port, &sample).await?;
                    report.emitted += 1;
                }
                Ok(ReadOutcome::NoRecord) => report.skipped += 1,
                Err(e) => {
                    debug!("[session {}] read failed: {}", port, e);
                    report.failed += 1;
                }
            }
        }

        self.sweeps += 1;
        trace!(
            "[acquisition] sweep {}: {} emitted, {} skipped, {} failed",
            self.sweeps, report.emitted, report.skipped, report.failed
        );
        Ok(report)
    }

    /// Sweep forever with no pause between passes. Returns only if the
    /// telemetry output fails.
    pub async fn run(&mut self) -> std::io::Result<Infallible> {
        info!("[acquisition] streaming {} port(s)", self.sessions.len());
        loop {
            self.sweep().await?;
        }
    }
}
