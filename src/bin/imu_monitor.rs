//! Reads the telemetry stream, keeps the latest reading per sensor and
//! prints every update as a JSON line.
//!
//! `MONITOR_PORT` names the serial device to open (`MONITOR_BAUD` sets its
//! speed); without it the stream is read from stdin, so the streamer's
//! output can be piped straight in.

use imu_array_streamer::bus::serial::{SerialBus, DEFAULT_BAUD_RATE};
use imu_array_streamer::init_tracing;
use imu_array_streamer::monitor::{LineKind, SensorTable};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    match std::env::var("MONITOR_PORT") {
        Ok(path) => {
            let baud_rate = match std::env::var("MONITOR_BAUD") {
                Ok(value) => value.parse()?,
                Err(_) => DEFAULT_BAUD_RATE,
            };
            let serial = SerialBus::new_with_baud(&path, baud_rate)?;
            info!("[monitor] reading {} at {} baud", serial.path(), baud_rate);
            monitor(serial.into_stream()).await
        }
        Err(_) => {
            info!("[monitor] reading stdin");
            monitor(tokio::io::stdin()).await
        }
    }
}

async fn monitor<R: AsyncRead + Unpin>(input: R) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(input).lines();
    let mut table = SensorTable::new();

    while let Some(line) = lines.next_line().await? {
        match table.ingest(&line) {
            LineKind::Record(port) => {
                if let Some(record) = table.get(port) {
                    println!("{}", record.to_json()?);
                }
            }
            LineKind::Announce(port) => info!("[monitor] sensor {} initializing", port),
            LineKind::Blank => {}
            LineKind::Malformed(e) => warn!("[monitor] skipping line {:?}: {}", line, e),
        }
    }

    debug!(
        "[monitor] stream closed after {} record(s), {} malformed",
        table.records(),
        table.malformed()
    );
    Ok(())
}
