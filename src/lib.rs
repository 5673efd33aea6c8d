// Public modules
pub mod acquisition;
pub mod bus;
pub mod config;
pub mod errors;
pub mod fusion;
pub mod monitor;
pub mod mux;
pub mod session;
pub mod telemetry;

// Re-export commonly used types
pub use acquisition::{AcquisitionCycle, SweepReport};
pub use config::{load_acquisition_config, AcquisitionConfig};
pub use errors::{StreamerError, StreamerResult};
pub use session::{ReadOutcome, SensorSession};
pub use telemetry::{TelemetryEmitter, TelemetryRecord};

use crate::bus::serial::SerialBus;
use crate::bus::{open_bus, I2CDevice, SharedBus};
use crate::fusion::{create_fusion_engine, EngineSettings, FusionEngine};
use crate::mux::ChannelSelector;
use tokio::io::AsyncWrite;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize tracing on stderr, keeping stdout free for telemetry
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

/// Run the streamer with the configuration found in `config_dir`.
///
/// Only returns on a startup failure or when the telemetry output breaks.
pub async fn run_streamer(config_dir: &str) -> StreamerResult<()> {
    info!("[ImuArrayStreamer] starting up...");

    let config_path = format!("{}/acquisition.toml", config_dir);
    let config = load_acquisition_config(&config_path)?;
    info!(
        "[config] {} port(s) behind mux {:#04x} on {}",
        config.multiplexer.channels, config.multiplexer.address, config.bus.path
    );

    let bus = open_bus(&config.bus.path).map_err(|source| StreamerError::BusOpen {
        path: config.bus.path.clone(),
        source,
    })?;

    let engines = (0..config.multiplexer.channels)
        .map(|_| create_fusion_engine(&config.sensor.driver, config.sensor.address, bus.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    let selector = ChannelSelector::new(config.multiplexer.address);
    let settings = config.sensor.engine_settings();
    let full_scale_g = config.sensor.accel_range.full_scale_g();

    match &config.output.serial {
        Some(path) => {
            let serial = SerialBus::new_with_baud(path, config.output.baud_rate).map_err(|source| {
                StreamerError::SerialOpen {
                    path: path.clone(),
                    source,
                }
            })?;
            info!("[output] telemetry on {} at {} baud", serial.path(), config.output.baud_rate);
            let emitter = TelemetryEmitter::new(serial.into_stream(), full_scale_g);
            stream(bus, selector, engines, settings, emitter).await
        }
        None => {
            info!("[output] no serial port configured, telemetry on stdout");
            let emitter = TelemetryEmitter::new(tokio::io::stdout(), full_scale_g);
            stream(bus, selector, engines, settings, emitter).await
        }
    }
}

async fn stream<W: AsyncWrite + Unpin>(
    bus: SharedBus<I2CDevice>,
    selector: ChannelSelector,
    engines: Vec<Box<dyn FusionEngine>>,
    settings: EngineSettings,
    emitter: TelemetryEmitter<W>,
) -> StreamerResult<()> {
    let mut cycle = AcquisitionCycle::new(bus, selector, engines, settings, emitter)?;
    cycle.initialize().await?;
    match cycle.run().await? {}
}
