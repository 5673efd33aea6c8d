use crate::mux::MAX_CHANNELS;
use crate::telemetry::{ParseRecordError, TelemetryRecord};

/// How one received line was classified
#[derive(Debug, PartialEq)]
pub enum LineKind {
    /// A record that replaced the stored reading for its port
    Record(u8),
    /// Startup trace naming a port that is being initialized
    Announce(u8),
    Blank,
    Malformed(ParseRecordError),
}

/// Latest reading per sensor, as seen by a reader of the telemetry stream
#[derive(Debug, Default)]
pub struct SensorTable {
    readings: [Option<TelemetryRecord>; MAX_CHANNELS as usize],
    records: u64,
    malformed: u64,
}

impl SensorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, line: &str) -> LineKind {
        let line = line.trim();
        if line.is_empty() {
            return LineKind::Blank;
        }

        match line.parse::<TelemetryRecord>() {
            Ok(record) => {
                self.readings[record.port as usize] = Some(record);
                self.records += 1;
                LineKind::Record(record.port)
            }
            Err(e) => match line.parse::<u8>() {
                Ok(port) if port < MAX_CHANNELS => LineKind::Announce(port),
                _ => {
                    self.malformed += 1;
                    LineKind::Malformed(e)
                }
            },
        }
    }

    pub fn get(&self, port: u8) -> Option<&TelemetryRecord> {
        self.readings.get(port as usize).and_then(Option::as_ref)
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn malformed(&self) -> u64 {
        self.malformed
    }
}
