/// FIFO Byte Channel
/// Byte-at-a-time access to the bridge transmit and receive FIFOs

use heapless::Vec;

use crate::bus::BridgeBus;
use crate::registers::{LineStatus, Register};
use crate::transport::RegisterTransport;

/// Bytes below this are control characters and are dropped on receive
pub const PRINTABLE_THRESHOLD: u8 = 0x20;

/// SC16C750 receive FIFO depth; the most one drain pass will read
pub const RX_FIFO_DEPTH: usize = 64;

/// Push every byte into THR, one register write each
///
/// Flow control is not consulted here; the EFR settings handle it in hardware.
pub fn write_bytes<B: BridgeBus>(
    transport: &mut RegisterTransport<B>,
    bytes: &[u8],
) -> Result<(), B::Error> {
    for &byte in bytes {
        transport.write_register(Register::Thr, byte)?;
    }
    Ok(())
}

/// Drain RHR while LSR reports data ready, keeping printable bytes
///
/// Returns what was buffered at call time; never waits for more. At most
/// `RX_FIFO_DEPTH` bytes are read per call, even if LSR never clears. Once
/// `N` bytes are collected the rest of the pass is still drained but discarded.
pub fn read_available<B: BridgeBus, const N: usize>(
    transport: &mut RegisterTransport<B>,
) -> Result<Vec<u8, N>, B::Error> {
    let mut received = Vec::new();
    let mut dropped = 0usize;

    for _ in 0..RX_FIFO_DEPTH {
        if !LineStatus::from(transport.read_register(Register::Lsr)?).data_ready() {
            break;
        }
        let byte = transport.read_register(Register::Rhr)?;
        if byte < PRINTABLE_THRESHOLD {
            continue;
        }
        if received.push(byte).is_err() {
            dropped += 1;
        }
    }

    if dropped > 0 {
        log::warn!("receive buffer full, dropped {} bytes", dropped);
    }
    Ok(received)
}

/// Bytes waiting in the receive FIFO (RXLVL)
pub fn rx_level<B: BridgeBus>(transport: &mut RegisterTransport<B>) -> Result<u8, B::Error> {
    transport.read_register(Register::RxLvl)
}

/// Free spaces in the transmit FIFO (TXLVL)
pub fn tx_level<B: BridgeBus>(transport: &mut RegisterTransport<B>) -> Result<u8, B::Error> {
    transport.read_register(Register::TxLvl)
}
