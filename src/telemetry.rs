use crate::mux::MAX_CHANNELS;
use crate::session::OrientationSample;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Magnitude of the most negative raw 16-bit reading
const RAW_FULL_SCALE: f32 = 32768.0;

/// Fields on one telemetry line: port, three accelerations, three angles
const FIELD_COUNT: usize = 7;

/// Fold values that print as zero onto +0.0, so `{:.6}` never shows `-0.000000`
fn unsigned_zero(v: f32) -> f32 {
    if (v * 1e6).round() == 0.0 {
        0.0
    } else {
        v
    }
}

/// Convert a raw signed 16-bit accelerometer reading to g
pub fn scale_acceleration(raw: i16, full_scale_g: f32) -> f32 {
    raw as f32 / RAW_FULL_SCALE * full_scale_g
}

/// One line of the telemetry stream.
///
/// Wire format: `<port> <a0> <a1> <a2> <yaw> <pitch> <roll>`, every float
/// with six decimals. The acceleration fields carry the three axes in the
/// order the device reports them.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct TelemetryRecord {
    pub port: u8,
    /// Acceleration in g
    pub accel: [f32; 3],
    /// Yaw in degrees
    pub yaw: f32,
    /// Pitch in degrees
    pub pitch: f32,
    /// Roll in degrees
    pub roll: f32,
}

impl TelemetryRecord {
    pub fn from_sample(port: u8, sample: &OrientationSample, full_scale_g: f32) -> Self {
        Self {
            port,
            accel: sample.accel_raw.map(|raw| scale_acceleration(raw, full_scale_g)),
            yaw: sample.angles.yaw.to_degrees(),
            pitch: sample.angles.pitch.to_degrees(),
            roll: sample.angles.roll.to_degrees(),
        }
    }

    /// Serialize to JSON for the monitor's snapshot output
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a0, a1, a2] = self.accel.map(unsigned_zero);
        let [yaw, pitch, roll] = [self.yaw, self.pitch, self.roll].map(unsigned_zero);
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}",
            self.port, a0, a1, a2, yaw, pitch, roll
        )
    }
}

/// Why a received line is not a telemetry record
#[derive(Error, Debug, PartialEq)]
pub enum ParseRecordError {
    #[error("expected 7 fields, found {found}")]
    FieldCount { found: usize },

    #[error("invalid sensor index '{0}'")]
    InvalidPort(String),

    #[error("field {index} is not a number: '{value}'")]
    InvalidNumber { index: usize, value: String },
}

impl FromStr for TelemetryRecord {
    type Err = ParseRecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.trim().split(' ').collect();
        if fields.len() != FIELD_COUNT {
            return Err(ParseRecordError::FieldCount { found: fields.len() });
        }

        let port = fields[0]
            .parse::<u8>()
            .ok()
            .filter(|port| *port < MAX_CHANNELS)
            .ok_or_else(|| ParseRecordError::InvalidPort(fields[0].to_string()))?;

        let mut values = [0f32; FIELD_COUNT - 1];
        for (index, (slot, field)) in values.iter_mut().zip(&fields[1..]).enumerate() {
            *slot = field.parse().map_err(|_| ParseRecordError::InvalidNumber {
                index: index + 1,
                value: field.to_string(),
            })?;
        }

        Ok(Self {
            port,
            accel: [values[0], values[1], values[2]],
            yaw: values[3],
            pitch: values[4],
            roll: values[5],
        })
    }
}

/// Writes telemetry lines to the output stream, one flush per line
pub struct TelemetryEmitter<W> {
    out: W,
    full_scale_g: f32,
}

impl<W: AsyncWrite + Unpin> TelemetryEmitter<W> {
    pub fn new(out: W, full_scale_g: f32) -> Self {
        Self { out, full_scale_g }
    }

    /// Startup trace: a line holding only the port index
    pub async fn announce_port(&mut self, port: u8) -> std::io::Result<()> {
        self.write_line(&port.to_string()).await
    }

    pub async fn emit(&mut self, port: u8, sample: &OrientationSample) -> std::io::Result<TelemetryRecord> {
        let record = TelemetryRecord::from_sample(port, sample, self.full_scale_g);
        self.write_line(&record.to_string()).await?;
        Ok(record)
    }

    async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.out.write_all(line.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
