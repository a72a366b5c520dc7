/// Simulated SC16C750 for host tests
/// Records every bus transaction and delay into one shared, ordered log

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::blocking::delay::DelayMs;

use crate::bus::BridgeBus;
use crate::registers::{Register, LCR_ENHANCED_ACCESS, READ_FLAG};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Write { addr: u8, value: u8 },
    Read { addr: u8 },
    Delay(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusFault;

pub type EventLog = Rc<RefCell<Vec<Event>>>;

pub struct FakeBridge {
    log: EventLog,
    lcr: u8,
    spr: u8,
    /// Returned for SPR reads instead of the stored value
    pub scratchpad_override: Option<u8>,
    /// Returned for LSR reads regardless of the receive queue
    pub lsr_override: Option<u8>,
    pub rx: VecDeque<u8>,
    pub iir: u8,
    /// Fail the transaction with this index (0-based), and every one after it
    pub fail_from: Option<usize>,
    pub fail_init: bool,
    transactions: usize,
    /// Bytes that landed in the transmit FIFO
    pub transmitted: Vec<u8>,
    /// Divisor latch writes as (DLH, DLL) when seen in the special bank
    pub dlh: Option<u8>,
    pub dll: Option<u8>,
    pub efr: Option<u8>,
}

impl FakeBridge {
    pub fn new(log: EventLog) -> Self {
        FakeBridge {
            log,
            lcr: 0x1D,
            spr: 0xFF,
            scratchpad_override: None,
            lsr_override: None,
            rx: VecDeque::new(),
            iir: 0x01,
            fail_from: None,
            fail_init: false,
            transactions: 0,
            transmitted: Vec::new(),
            dlh: None,
            dll: None,
            efr: None,
        }
    }

    pub fn with_rx(log: EventLog, bytes: &[u8]) -> Self {
        let mut bridge = FakeBridge::new(log);
        bridge.rx.extend(bytes.iter().copied());
        bridge
    }

    fn tick(&mut self) -> Result<(), BusFault> {
        let index = self.transactions;
        self.transactions += 1;
        match self.fail_from {
            Some(limit) if index >= limit => Err(BusFault),
            _ => Ok(()),
        }
    }

    fn special(&self) -> bool {
        self.lcr != LCR_ENHANCED_ACCESS && self.lcr & 0x80 != 0
    }

    fn enhanced(&self) -> bool {
        self.lcr == LCR_ENHANCED_ACCESS
    }

    fn store(&mut self, addr: u8, value: u8) {
        let index = addr >> 3;
        if index == Register::Lcr.index() {
            self.lcr = value;
        } else if self.enhanced() && index == Register::Efr.index() {
            self.efr = Some(value);
        } else if self.special() && index == Register::Dlh.index() {
            self.dlh = Some(value);
        } else if self.special() && index == Register::Dll.index() {
            self.dll = Some(value);
        } else if index == Register::Thr.index() {
            self.transmitted.push(value);
        } else if index == Register::Spr.index() {
            self.spr = value;
        }
    }

    fn load(&mut self, addr: u8) -> u8 {
        let index = addr >> 3;
        if index == Register::Lsr.index() {
            let ready = if self.rx.is_empty() { 0x00 } else { 0x01 };
            self.lsr_override.unwrap_or(0x60 | ready)
        } else if index == Register::Rhr.index() {
            self.rx.pop_front().unwrap_or(0)
        } else if index == Register::Iir.index() {
            self.iir
        } else if index == Register::Spr.index() {
            self.scratchpad_override.unwrap_or(self.spr)
        } else if index == Register::RxLvl.index() {
            self.rx.len() as u8
        } else if index == Register::TxLvl.index() {
            64
        } else if index == Register::Lcr.index() {
            self.lcr
        } else {
            0
        }
    }
}

impl BridgeBus for FakeBridge {
    type Error = BusFault;

    fn init(&mut self) -> Result<(), BusFault> {
        if self.fail_init {
            Err(BusFault)
        } else {
            Ok(())
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), BusFault> {
        self.tick()?;
        assert_eq!(data.len(), 2, "register writes are two bytes");
        assert_eq!(data[0] & READ_FLAG, 0, "write with read flag set");
        self.log.borrow_mut().push(Event::Write { addr: data[0], value: data[1] });
        self.store(data[0], data[1]);
        Ok(())
    }

    fn exchange(&mut self, data: &mut [u8]) -> Result<(), BusFault> {
        self.tick()?;
        assert_eq!(data.len(), 2, "register reads are two bytes");
        assert_ne!(data[0] & READ_FLAG, 0, "read without read flag");
        let addr = data[0] & !READ_FLAG;
        self.log.borrow_mut().push(Event::Read { addr });
        let value = self.load(addr);
        data[0] = 0xFF;
        data[1] = value;
        Ok(())
    }
}

pub struct FakeDelay {
    log: EventLog,
}

impl FakeDelay {
    pub fn new(log: EventLog) -> Self {
        FakeDelay { log }
    }
}

impl DelayMs<u16> for FakeDelay {
    fn delay_ms(&mut self, ms: u16) {
        self.log.borrow_mut().push(Event::Delay(ms));
    }
}

pub fn new_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

/// Register writes only, as (wire address, value)
pub fn writes(log: &EventLog) -> Vec<(u8, u8)> {
    log.borrow()
        .iter()
        .filter_map(|event| match *event {
            Event::Write { addr, value } => Some((addr, value)),
            _ => None,
        })
        .collect()
}
