/// Driver Errors
/// Failure kinds surfaced by setup and the command calls

use core::fmt::{self, Write};
use heapless::String;

/// Room for the captured `last_error` message
pub const ERROR_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error<E> {
    /// Baud selector outside the 10-entry rate table
    InvalidBaudRate(i16),
    /// The SPI bus could not be brought up
    BusInit(E),
    /// Scratchpad readback did not echo the sentinel
    BridgeSelfTestFailed { expected: u8, read: u8 },
    /// The interrupt line could not be registered
    InterruptInit,
    /// A register exchange failed mid-operation
    Bus(E),
    /// Command calls before a successful setup
    NotConfigured,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidBaudRate(index) => write!(f, "Invalid baud rate index {}", index),
            Error::BusInit(e) => write!(f, "SPI init error ({:?})", e),
            Error::BridgeSelfTestFailed { expected, read } => write!(
                f,
                "Failed to init SPI<->UART chip (SPR 0x{:02X} != 0x{:02X})",
                read, expected
            ),
            Error::InterruptInit => write!(f, "IRQ init error"),
            Error::Bus(e) => write!(f, "SPI transfer error ({:?})", e),
            Error::NotConfigured => write!(f, "Bridge not configured"),
        }
    }
}

/// Render an error into a fixed-size message, truncating if it does not fit
pub fn capture<E: fmt::Debug>(error: &Error<E>) -> String<ERROR_CAPACITY> {
    let mut message = String::new();
    if write!(&mut message, "{}", error).is_err() {
        // Keep the prefix that fit
        while message.len() > ERROR_CAPACITY - 3 {
            message.pop();
        }
        let _ = message.push_str("...");
    }
    message
}
