#![cfg_attr(not(test), no_std)]

// Public modules for testing
pub mod baud;
pub mod bus;
pub mod channel;
pub mod command;
pub mod config;
pub mod configure;
pub mod error;
pub mod interrupt;
pub mod logger;
pub mod registers;
pub mod shared;
pub mod shield;
pub mod state;
pub mod transport;

#[cfg(test)]
mod mock;

pub use baud::{BaudRate, ClockRate};
pub use bus::{BridgeBus, ChipSelect};
pub use config::Config;
pub use error::Error;
pub use interrupt::{InterruptCause, InterruptLine, LevelLowPin, NoInterruptLine};
pub use shared::{InterruptMask, NoMask, SharedShield};
pub use shield::Shield;
pub use state::DriverState;
