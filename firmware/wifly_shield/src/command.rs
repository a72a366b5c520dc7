/// WiFly Command Protocol
/// Command-mode entry and CR-terminated commands over the bridge FIFOs
///
/// Responses ("CMD", "AOK", "ERR: ...") are handed back as raw text; nothing
/// here interprets them.

use embedded_hal::blocking::delay::DelayMs;
use heapless::{String, Vec};

use crate::bus::BridgeBus;
use crate::channel::{read_available, write_bytes};
use crate::registers::Register;
use crate::transport::RegisterTransport;

/// Marker that switches the module into command mode
pub const COMMAND_MODE_SEQUENCE: &[u8] = b"$$$";

/// The module needs 250 ms of silence after the marker, or it treats it as data
pub const COMMAND_MODE_SETTLE_MS: u16 = 300;

pub const COMMAND_TERMINATOR: u8 = b'\r';

/// Leaves command mode, module answers "EXIT"
pub const EXIT_COMMAND: &str = "exit";

/// Restarts the module, which drops command mode
pub const REBOOT_COMMAND: &str = "reboot";

/// Bytes captured per `read_response` call
pub const RESPONSE_CAPACITY: usize = 256;

/// Latin-1 above 0x7F takes two UTF-8 bytes
pub const RESPONSE_TEXT_CAPACITY: usize = 2 * RESPONSE_CAPACITY;

pub type Response = String<RESPONSE_TEXT_CAPACITY>;

/// Send the mode-switch marker and hold the line quiet for the settling window
pub fn enter_command_mode<B: BridgeBus, D: DelayMs<u16>>(
    transport: &mut RegisterTransport<B>,
    delay: &mut D,
) -> Result<(), B::Error> {
    write_bytes(transport, COMMAND_MODE_SEQUENCE)?;
    delay.delay_ms(COMMAND_MODE_SETTLE_MS);
    Ok(())
}

/// Raw text, no terminator
pub fn send_string<B: BridgeBus>(transport: &mut RegisterTransport<B>, text: &str) -> Result<(), B::Error> {
    log::debug!("> {}", text);
    write_bytes(transport, text.as_bytes())
}

/// `text` followed by a carriage return
pub fn send_command<B: BridgeBus>(transport: &mut RegisterTransport<B>, text: &str) -> Result<(), B::Error> {
    send_string(transport, text)?;
    transport.write_register(Register::Thr, COMMAND_TERMINATOR)
}

/// Printable text currently sitting in the receive FIFO, empty if none
pub fn read_response<B: BridgeBus>(transport: &mut RegisterTransport<B>) -> Result<Response, B::Error> {
    let bytes: Vec<u8, RESPONSE_CAPACITY> = read_available(transport)?;

    let mut response = Response::new();
    for (taken, &byte) in bytes.iter().enumerate() {
        // Bytes map 1:1 onto Latin-1 code points
        if response.push(char::from(byte)).is_err() {
            log::warn!("response text full, dropped {} bytes", bytes.len() - taken);
            break;
        }
    }
    Ok(response)
}
