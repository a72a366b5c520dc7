/// Bridge Configurator
/// Programs the SC16C750 baud generator, line format and FIFOs, then self-tests
///
/// Register order matters: DLL/DLH and EFR only exist while LCR holds the
/// matching access pattern, so LCR is always rewritten before them.

use crate::baud::{BaudRate, ClockRate, Divisor};
use crate::bus::BridgeBus;
use crate::error::Error;
use crate::registers::{
    EnhancedFeatures, FifoControl, LineControl, Register, LCR_ENHANCED_ACCESS,
    SCRATCHPAD_SENTINEL,
};
use crate::transport::RegisterTransport;

/// Run the full configuration sequence for `baud_index` on `clock`
///
/// Returns the rate actually programmed. The index is checked before any bus traffic.
pub fn configure<B: BridgeBus>(
    transport: &mut RegisterTransport<B>,
    clock: ClockRate,
    baud_index: i16,
) -> Result<BaudRate, Error<B::Error>> {
    let requested = BaudRate::from_index(baud_index).ok_or(Error::InvalidBaudRate(baud_index))?;

    // Divisor latch
    transport
        .write_register(Register::Lcr, LineControl::divisor_latch_enabled().bits())
        .map_err(Error::Bus)?;

    let baud = requested.effective(clock);
    if baud != requested {
        log::debug!(
            "{} bps unreachable with {:?}, using {} bps",
            requested.bps(),
            clock,
            baud.bps()
        );
    }
    write_divisor(transport, Divisor::new(clock, baud))?;

    // No hardware flow control through MCR on this part, EFR has to unlock it
    transport
        .write_register(Register::Lcr, LCR_ENHANCED_ACCESS)
        .map_err(Error::Bus)?;
    transport
        .write_register(Register::Efr, EnhancedFeatures::unlocked().bits())
        .map_err(Error::Bus)?;

    transport
        .write_register(Register::Lcr, LineControl::eight_n_one().bits())
        .map_err(Error::Bus)?;
    transport
        .write_register(Register::Fcr, FifoControl::reset_both().bits())
        .map_err(Error::Bus)?;
    transport
        .write_register(Register::Fcr, FifoControl::enabled().bits())
        .map_err(Error::Bus)?;

    self_test(transport)?;

    log::debug!("bridge configured: {} bps, {:?}", baud.bps(), clock);
    Ok(baud)
}

/// DLH then DLL; caller must have the divisor latch exposed
fn write_divisor<B: BridgeBus>(
    transport: &mut RegisterTransport<B>,
    divisor: Divisor,
) -> Result<(), Error<B::Error>> {
    transport
        .write_register(Register::Dlh, divisor.high())
        .map_err(Error::Bus)?;
    transport
        .write_register(Register::Dll, divisor.low())
        .map_err(Error::Bus)
}

/// Scratchpad echo: the only proof the wiring and the chip are alive
pub fn self_test<B: BridgeBus>(transport: &mut RegisterTransport<B>) -> Result<(), Error<B::Error>> {
    transport
        .write_register(Register::Spr, SCRATCHPAD_SENTINEL)
        .map_err(Error::Bus)?;
    let read = transport.read_register(Register::Spr).map_err(Error::Bus)?;

    if read != SCRATCHPAD_SENTINEL {
        log::error!("scratchpad readback 0x{:02X}, expected 0x{:02X}", read, SCRATCHPAD_SENTINEL);
        return Err(Error::BridgeSelfTestFailed {
            expected: SCRATCHPAD_SENTINEL,
            read,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baud::BAUD_RATE_TABLE;
    use crate::mock::{new_log, writes, Event, FakeBridge};
    use itertools::iproduct;

    fn run(clock: ClockRate, index: i16) -> (Result<BaudRate, Error<crate::mock::BusFault>>, FakeBridge, crate::mock::EventLog) {
        let log = new_log();
        let mut transport = RegisterTransport::new(FakeBridge::new(log.clone()));
        let result = configure(&mut transport, clock, index);
        (result, transport.release(), log)
    }

    #[test]
    fn test_write_sequence_14mhz_9600() {
        let (result, _bridge, log) = run(ClockRate::Xtal14Mhz, 3);
        assert_eq!(result, Ok(BaudRate::B9600));

        assert_eq!(
            *log.borrow(),
            vec![
                Event::Write { addr: 0x18, value: 0x80 }, // LCR: divisor latch
                Event::Write { addr: 0x08, value: 0x00 }, // DLH
                Event::Write { addr: 0x00, value: 0x60 }, // DLL (96)
                Event::Write { addr: 0x18, value: 0xBF }, // LCR: enhanced access
                Event::Write { addr: 0x10, value: 0x10 }, // EFR: enhanced functions
                Event::Write { addr: 0x18, value: 0x03 }, // LCR: 8N1
                Event::Write { addr: 0x10, value: 0x06 }, // FCR: reset FIFOs
                Event::Write { addr: 0x10, value: 0x01 }, // FCR: enable FIFOs
                Event::Write { addr: 0x38, value: 0x55 }, // SPR
                Event::Read { addr: 0x38 },
            ]
        );
    }

    #[test]
    fn test_divisor_grid() {
        let clocks = [ClockRate::Xtal12Mhz, ClockRate::Xtal14Mhz];
        for (clock, index) in iproduct!(clocks, 0..10i16) {
            if clock == ClockRate::Xtal12Mhz && index == 9 {
                continue;
            }
            let (result, bridge, _log) = run(clock, index);
            assert!(result.is_ok(), "{:?} index {}", clock, index);

            let divisor = clock.hz() / (BAUD_RATE_TABLE[index as usize] * 16);
            assert_eq!(bridge.dlh, Some((divisor >> 8) as u8), "{:?} index {}", clock, index);
            assert_eq!(bridge.dll, Some((divisor & 0xFF) as u8), "{:?} index {}", clock, index);
        }
    }

    #[test]
    fn test_12mhz_921600_uses_460800() {
        let (result, bridge, _log) = run(ClockRate::Xtal12Mhz, 9);
        assert_eq!(result, Ok(BaudRate::B460800));

        // 12288000 / (460800 * 16) = 1
        assert_eq!(bridge.dlh, Some(0x00));
        assert_eq!(bridge.dll, Some(0x01));
        assert_eq!(bridge.efr, Some(0x10));
    }

    #[test]
    fn test_divisor_written_inside_latch_window() {
        let (_result, _bridge, log) = run(ClockRate::Xtal12Mhz, 0);
        let writes = writes(&log);

        assert_eq!(writes[0], (0x18, 0x80));
        assert_eq!(writes[1], (0x08, 0x02));
        assert_eq!(writes[2], (0x00, 0x80));
        assert_eq!(writes[3].0, 0x18);
    }

    #[test]
    fn test_invalid_index_touches_nothing() {
        for index in [-1i16, 10, 200] {
            let (result, _bridge, log) = run(ClockRate::Xtal14Mhz, index);
            assert_eq!(result, Err(Error::InvalidBaudRate(index)));
            assert!(log.borrow().is_empty());
        }
    }

    #[test]
    fn test_self_test_mismatch_fails() {
        let log = new_log();
        let mut bridge = FakeBridge::new(log.clone());
        bridge.scratchpad_override = Some(0x00);
        let mut transport = RegisterTransport::new(bridge);

        let result = configure(&mut transport, ClockRate::Xtal14Mhz, 3);

        assert_eq!(
            result,
            Err(Error::BridgeSelfTestFailed { expected: 0x55, read: 0x00 })
        );
    }

    #[test]
    fn test_bus_failure_aborts_sequence() {
        let log = new_log();
        let mut bridge = FakeBridge::new(log.clone());
        bridge.fail_from = Some(3);
        let mut transport = RegisterTransport::new(bridge);

        let result = configure(&mut transport, ClockRate::Xtal14Mhz, 3);

        assert!(matches!(result, Err(Error::Bus(_))));
        assert_eq!(log.borrow().len(), 3);
    }
}
