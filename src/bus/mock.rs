//! Mock I2C bus for testing
//!
//! Records every transfer together with the multiplexer channel that was
//! active when it happened, and serves pre-programmed register reads. Writes
//! to a device set its register pointer; reads start from that pointer.

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};
use std::collections::{HashMap, HashSet, VecDeque};

/// One recorded bus transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusTransaction {
    Write { address: u8, data: Vec<u8>, channel: Option<u8> },
    Read { address: u8, reg: u8, len: usize, channel: Option<u8> },
}

impl BusTransaction {
    pub fn address(&self) -> u8 {
        match self {
            BusTransaction::Write { address, .. } | BusTransaction::Read { address, .. } => *address,
        }
    }

    pub fn channel(&self) -> Option<u8> {
        match self {
            BusTransaction::Write { channel, .. } | BusTransaction::Read { channel, .. } => *channel,
        }
    }
}

#[derive(Debug)]
pub struct MockBus {
    mux_address: u8,
    /// Port routed by the last valid one-hot mask written to the mux
    active_channel: Option<u8>,
    transactions: Vec<BusTransaction>,
    pointers: HashMap<u8, u8>,
    reads: HashMap<(u8, u8), VecDeque<u8>>,
    failing: HashSet<u8>,
    failing_once: HashSet<u8>,
}

impl MockBus {
    pub fn new(mux_address: u8) -> Self {
        Self {
            mux_address,
            active_channel: None,
            transactions: Vec::new(),
            pointers: HashMap::new(),
            reads: HashMap::new(),
            failing: HashSet::new(),
            failing_once: HashSet::new(),
        }
    }

    pub fn active_channel(&self) -> Option<u8> {
        self.active_channel
    }

    pub fn transactions(&self) -> &[BusTransaction] {
        &self.transactions
    }

    pub fn clear_transactions(&mut self) {
        self.transactions.clear();
    }

    /// Queue bytes streamed out of a single register, like a FIFO port
    pub fn queue_read(&mut self, address: u8, reg: u8, data: &[u8]) {
        self.reads.entry((address, reg)).or_default().extend(data.iter().copied());
    }

    /// Queue one byte per register, starting at `start`
    pub fn queue_registers(&mut self, address: u8, start: u8, data: &[u8]) {
        for (offset, byte) in data.iter().enumerate() {
            self.queue_read(address, start.wrapping_add(offset as u8), &[*byte]);
        }
    }

    /// Make every transfer addressed to `address` fail
    pub fn fail_address(&mut self, address: u8) {
        self.failing.insert(address);
    }

    /// Make only the next transfer addressed to `address` fail
    pub fn fail_next(&mut self, address: u8) {
        self.failing_once.insert(address);
    }

    fn check(&mut self, address: u8) -> Result<(), ErrorKind> {
        if self.failing.contains(&address) || self.failing_once.remove(&address) {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        Ok(())
    }

    fn handle_write(&mut self, address: u8, data: &[u8]) {
        self.transactions.push(BusTransaction::Write {
            address,
            data: data.to_vec(),
            channel: self.active_channel,
        });

        if address == self.mux_address {
            if let [mask] = data {
                if mask.count_ones() == 1 {
                    self.active_channel = Some(mask.trailing_zeros() as u8);
                }
            }
        } else if let Some(reg) = data.first() {
            self.pointers.insert(address, *reg);
        }
    }

    fn handle_read(&mut self, address: u8, buf: &mut [u8]) {
        let reg = self.pointers.get(&address).copied().unwrap_or(0);
        self.transactions.push(BusTransaction::Read {
            address,
            reg,
            len: buf.len(),
            channel: self.active_channel,
        });

        let streamed = self.reads.get(&(address, reg)).map_or(0, VecDeque::len);
        if streamed >= buf.len() {
            let queued = self.reads.entry((address, reg)).or_default();
            for byte in buf.iter_mut() {
                *byte = queued.pop_front().unwrap_or(0);
            }
        } else {
            // Auto-increment: byte n comes from register reg + n
            for (offset, byte) in buf.iter_mut().enumerate() {
                let key = (address, reg.wrapping_add(offset as u8));
                *byte = self.reads.get_mut(&key).and_then(VecDeque::pop_front).unwrap_or(0);
            }
        }
    }
}

impl ErrorType for MockBus {
    type Error = ErrorKind;
}

impl I2c for MockBus {
    fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        self.check(address)?;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(data) => self.handle_write(address, data),
                Operation::Read(buf) => self.handle_read(address, buf),
            }
        }
        Ok(())
    }
}
