/// Setup Configuration
/// What `Shield::setup` programs into the bridge

use crate::baud::{BaudRate, ClockRate};

/// Baud selector used when none is given (9600)
pub const DEFAULT_BAUD_INDEX: i16 = BaudRate::B9600 as i16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub clock_rate: ClockRate,
    /// Index into `BAUD_RATE_TABLE`, validated by setup
    pub baud_index: i16,
    /// Register for bridge interrupts after configuring
    pub enable_interrupt: bool,
    /// Send the command-mode marker once the bridge is up
    pub enter_command_mode: bool,
}

impl Config {
    pub fn new(clock_rate: ClockRate, baud_index: i16) -> Self {
        Config {
            clock_rate,
            baud_index,
            ..Config::default()
        }
    }

    pub fn with_baud_index(mut self, baud_index: i16) -> Self {
        self.baud_index = baud_index;
        self
    }

    pub fn with_interrupt(mut self, enable: bool) -> Self {
        self.enable_interrupt = enable;
        self
    }

    pub fn with_command_mode(mut self, enter: bool) -> Self {
        self.enter_command_mode = enter;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            clock_rate: ClockRate::Xtal14Mhz,
            baud_index: DEFAULT_BAUD_INDEX,
            enable_interrupt: false,
            enter_command_mode: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.clock_rate, ClockRate::Xtal14Mhz);
        assert_eq!(config.baud_index, 3);
        assert!(!config.enable_interrupt);
        assert!(config.enter_command_mode);
    }

    #[test]
    fn test_builder() {
        let config = Config::new(ClockRate::Xtal12Mhz, 9)
            .with_interrupt(true)
            .with_command_mode(false);

        assert_eq!(config.clock_rate, ClockRate::Xtal12Mhz);
        assert_eq!(config.baud_index, 9);
        assert!(config.enable_interrupt);
        assert!(!config.enter_command_mode);
    }
}
