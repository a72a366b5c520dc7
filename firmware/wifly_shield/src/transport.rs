/// Register Transport
/// Frames register accesses into two-byte bus exchanges

use crate::bus::BridgeBus;
use crate::registers::{Register, READ_FLAG};

/// Sole owner of the bus handle and its exchange buffer
pub struct RegisterTransport<B> {
    bus: B,
    buffer: [u8; 2],
}

impl<B: BridgeBus> RegisterTransport<B> {
    pub fn new(bus: B) -> Self {
        RegisterTransport { bus, buffer: [0u8; 2] }
    }

    /// Bring the underlying bus to idle
    pub fn init(&mut self) -> Result<(), B::Error> {
        self.bus.init()
    }

    /// One write transaction: [address, value]
    pub fn write_register(&mut self, reg: Register, value: u8) -> Result<(), B::Error> {
        self.buffer[0] = reg.wire_address();
        self.buffer[1] = value;
        self.bus.write(&self.buffer)
    }

    /// One exchange transaction: [address | read flag, placeholder], value comes back in byte 1
    pub fn read_register(&mut self, reg: Register) -> Result<u8, B::Error> {
        self.buffer[0] = reg.wire_address() | READ_FLAG;
        self.buffer[1] = 0;
        self.bus.exchange(&mut self.buffer)?;
        Ok(self.buffer[1])
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn release(self) -> B {
        self.bus
    }
}
