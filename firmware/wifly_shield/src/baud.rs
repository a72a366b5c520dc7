/// Baud Rate Arithmetic
/// Crystal selection, the supported rate table and divisor computation

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Crystals fitted to known WiFly shield revisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockRate {
    Xtal12Mhz,
    Xtal14Mhz,
}

impl ClockRate {
    pub const fn hz(self) -> u32 {
        match self {
            ClockRate::Xtal12Mhz => 12_288_000,
            ClockRate::Xtal14Mhz => 14_745_600,
        }
    }
}

/// Rates the SC16C750 is driven at, selected by table index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum BaudRate {
    B1200 = 0,
    B2400 = 1,
    B4800 = 2,
    B9600 = 3,
    B19200 = 4,
    B38400 = 5,
    B57600 = 6,
    B230400 = 7,
    B460800 = 8,
    B921600 = 9,
}

/// Bits per second, indexed by `BaudRate`
pub const BAUD_RATE_TABLE: [u32; 10] = [
    1200, 2400, 4800, 9600, 19200, 38400, 57600, 230400, 460800, 921600,
];

impl BaudRate {
    /// Look up a table selector; anything outside 0..=9 is rejected
    pub fn from_index(index: i16) -> Option<Self> {
        let index = u8::try_from(index).ok()?;
        BaudRate::try_from(index).ok()
    }

    pub fn index(self) -> u8 {
        self.into()
    }

    pub fn bps(self) -> u32 {
        BAUD_RATE_TABLE[self.index() as usize]
    }

    /// The entry one step down the table (saturates at the bottom)
    pub fn next_lower(self) -> Self {
        match self.index().checked_sub(1) {
            Some(lower) => BaudRate::try_from(lower).unwrap_or(self),
            None => self,
        }
    }

    /// The rate actually programmed for `clock`
    ///
    /// The 12.288 MHz crystal cannot reach 921600, so that pairing runs one step lower.
    pub fn effective(self, clock: ClockRate) -> Self {
        if clock == ClockRate::Xtal12Mhz && self == BaudRate::B921600 {
            self.next_lower()
        } else {
            self
        }
    }
}

/// Baud generator divisor, split across DLH/DLL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Divisor(pub u16);

impl Divisor {
    /// crystal / (baud * 16), truncated
    pub fn new(clock: ClockRate, baud: BaudRate) -> Self {
        Divisor((clock.hz() / (baud.bps() * 16)) as u16)
    }

    pub fn high(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn low(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}
