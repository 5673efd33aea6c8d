//! Scripted fusion engine for testing
//!
//! Plays back a fixed packet status sequence and records every call. Each
//! packet fetch also touches the bus so the mock bus can show which
//! multiplexer channel was active at the time.

use super::{AccelRange, FusionEngine, GyroRange, PacketStatus};
use crate::bus::mock::MockBus;
use crate::bus::SharedBus;
use crate::errors::{SensorError, SensorResult};
use async_trait::async_trait;
use embedded_hal::i2c::I2c;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// FIFO count register, read to make each fetch visible on the bus
const FIFO_COUNT_REG: u8 = 0x72;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineCall {
    Initialize,
    SetAccelFullScale(AccelRange),
    SetGyroFullScale(GyroRange),
    LoadDmp,
    SetRate(u8),
    SetDmpEnabled(bool),
    CurrentPacket,
    ResetFifo,
    Acceleration,
}

pub struct ScriptedEngine {
    address: u8,
    bus: SharedBus<MockBus>,
    /// Statuses returned by successive fetches; the last one repeats
    statuses: VecDeque<PacketStatus>,
    packet: Vec<u8>,
    accel: [i16; 3],
    fail_init: bool,
    calls: Arc<Mutex<Vec<EngineCall>>>,
}

impl ScriptedEngine {
    pub const PACKET_LEN: usize = 28;

    pub fn new(bus: &SharedBus<MockBus>, address: u8) -> Self {
        Self {
            address,
            bus: bus.clone(),
            statuses: VecDeque::from([PacketStatus::Ready]),
            packet: vec![0u8; Self::PACKET_LEN],
            accel: [0; 3],
            fail_init: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_statuses(mut self, statuses: &[PacketStatus]) -> Self {
        self.statuses = statuses.iter().copied().collect();
        self
    }

    /// Packet carrying quaternion `q` as Q14 values in (w, x, y, z) order
    pub fn with_quaternion(mut self, q: [i16; 4]) -> Self {
        for (i, component) in q.iter().enumerate() {
            self.packet[i * 4..i * 4 + 2].copy_from_slice(&component.to_be_bytes());
        }
        self
    }

    pub fn with_acceleration(mut self, accel: [i16; 3]) -> Self {
        self.accel = accel;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Shared handle on the call log, usable after the engine is boxed
    pub fn calls(&self) -> Arc<Mutex<Vec<EngineCall>>> {
        self.calls.clone()
    }

    fn record(&self, call: EngineCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn next_status(&mut self) -> PacketStatus {
        if self.statuses.len() > 1 {
            self.statuses.pop_front().unwrap_or(PacketStatus::Empty)
        } else {
            self.statuses.front().copied().unwrap_or(PacketStatus::Empty)
        }
    }
}

#[async_trait]
impl FusionEngine for ScriptedEngine {
    fn packet_len(&self) -> usize {
        Self::PACKET_LEN
    }

    async fn initialize(&mut self) -> SensorResult<()> {
        self.record(EngineCall::Initialize);
        if self.fail_init {
            return Err(SensorError::InitError {
                address: self.address,
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    async fn set_accel_full_scale(&mut self, range: AccelRange) -> SensorResult<()> {
        self.record(EngineCall::SetAccelFullScale(range));
        Ok(())
    }

    async fn set_gyro_full_scale(&mut self, range: GyroRange) -> SensorResult<()> {
        self.record(EngineCall::SetGyroFullScale(range));
        Ok(())
    }

    async fn load_dmp(&mut self) -> SensorResult<()> {
        self.record(EngineCall::LoadDmp);
        Ok(())
    }

    async fn set_rate(&mut self, divider: u8) -> SensorResult<()> {
        self.record(EngineCall::SetRate(divider));
        Ok(())
    }

    async fn set_dmp_enabled(&mut self, enabled: bool) -> SensorResult<()> {
        self.record(EngineCall::SetDmpEnabled(enabled));
        Ok(())
    }

    async fn current_packet(&mut self, packet: &mut [u8]) -> SensorResult<PacketStatus> {
        self.record(EngineCall::CurrentPacket);
        let mut count = [0u8; 2];
        self.bus
            .write_read(self.address, &[FIFO_COUNT_REG], &mut count)
            .map_err(|e| SensorError::Bus {
                address: self.address,
                reason: format!("{:?}", e),
            })?;

        let status = self.next_status();
        if status == PacketStatus::Ready {
            packet.copy_from_slice(&self.packet);
        }
        Ok(status)
    }

    async fn reset_fifo(&mut self) -> SensorResult<()> {
        self.record(EngineCall::ResetFifo);
        Ok(())
    }

    async fn acceleration(&mut self) -> SensorResult<[i16; 3]> {
        self.record(EngineCall::Acceleration);
        Ok(self.accel)
    }
}
