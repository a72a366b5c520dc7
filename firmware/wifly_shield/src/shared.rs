/// Shared Driver Access
/// Serialises the normal path and the interrupt path on one bridge
///
/// Register exchanges from an interrupt must never land in the middle of a
/// multi-write sequence such as the configuration unlock. The normal path holds
/// the lock for a whole operation with the bridge interrupt masked; the
/// interrupt path only ever `try_lock`s and defers to the lock holder when it
/// loses. Pending work is re-checked after every unlock.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use embedded_hal::blocking::delay::DelayMs;
use spin::Mutex;

use crate::bus::BridgeBus;
use crate::interrupt::{self, InterruptCause, InterruptLine, NoInterruptLine};
use crate::shield::Shield;

/// Gate for the interrupt that calls `SharedShield::service_interrupt`
///
/// The bridge /IRQ is level-low and stays asserted until IIR is read, so the
/// interrupt has to be masked while the lock is held or it re-enters forever.
/// On Cortex-M this is `NVIC::mask` / `NVIC::unmask` for the external
/// interrupt the pin is routed to.
pub trait InterruptMask {
    fn mask(&self);
    fn unmask(&self);
}

/// No interrupt context; the driver is only polled from the lock holder
pub struct NoMask;

impl InterruptMask for NoMask {
    fn mask(&self) {}
    fn unmask(&self) {}
}

/// `deferred` holds no cause
const NO_CAUSE: u8 = 0xFF;

pub struct SharedShield<B, D, L = NoInterruptLine, M = NoMask> {
    shield: Mutex<Shield<B, D, L>>,
    mask: M,
    pending: AtomicBool,
    deferred: AtomicU8,
}

impl<B, D, L> SharedShield<B, D, L, NoMask>
where
    B: BridgeBus,
    D: DelayMs<u16>,
    L: InterruptLine,
{
    pub const fn new(shield: Shield<B, D, L>) -> Self {
        SharedShield::with_mask(shield, NoMask)
    }
}

impl<B, D, L, M> SharedShield<B, D, L, M>
where
    B: BridgeBus,
    D: DelayMs<u16>,
    L: InterruptLine,
    M: InterruptMask,
{
    pub const fn with_mask(shield: Shield<B, D, L>, mask: M) -> Self {
        SharedShield {
            shield: Mutex::new(shield),
            mask,
            pending: AtomicBool::new(false),
            deferred: AtomicU8::new(NO_CAUSE),
        }
    }

    /// Run `f` with exclusive access and the bridge interrupt masked, then
    /// service any interrupt that arrived meanwhile
    pub fn with<R>(&self, f: impl FnOnce(&mut Shield<B, D, L>) -> R) -> R {
        self.mask.mask();
        let result = {
            let mut shield = self.shield.lock();
            f(&mut *shield)
        };
        self.mask.unmask();
        self.service_pending();
        result
    }

    /// Entry point for interrupt context
    ///
    /// Returns the decoded cause, or `None` if the driver was busy (the
    /// interrupt is then masked and serviced once the holder unlocks) or the
    /// code was not recognised.
    pub fn service_interrupt(&self) -> Option<InterruptCause> {
        let cause = match self.shield.try_lock() {
            Some(mut shield) => self.dispatch(&mut shield),
            None => {
                self.pending.store(true, Ordering::Release);
                self.mask.mask();
                return None;
            }
        };
        self.service_pending();
        cause
    }

    /// An interrupt is waiting for the lock holder
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Cause of the last interrupt serviced on behalf of a busy interrupt path
    pub fn take_deferred(&self) -> Option<InterruptCause> {
        match self.deferred.swap(NO_CAUSE, Ordering::AcqRel) {
            NO_CAUSE => None,
            code => interrupt::decode(code),
        }
    }

    pub fn into_inner(self) -> Shield<B, D, L> {
        self.shield.into_inner()
    }

    /// Drain deferred interrupts; the guard is dropped before each re-check
    fn service_pending(&self) {
        while self.pending.swap(false, Ordering::AcqRel) {
            match self.shield.try_lock() {
                Some(mut shield) => {
                    log::trace!("servicing deferred interrupt");
                    if let Some(cause) = self.dispatch(&mut shield) {
                        self.deferred.store(cause.code(), Ordering::Release);
                    }
                }
                None => {
                    // Holder drains it on unlock
                    self.pending.store(true, Ordering::Release);
                    break;
                }
            }
        }
    }

    fn dispatch(&self, shield: &mut Shield<B, D, L>) -> Option<InterruptCause> {
        match shield.on_interrupt() {
            Ok(cause) => cause,
            Err(e) => {
                log::warn!("interrupt service failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::mock::{new_log, Event, EventLog, FakeBridge, FakeDelay};
    use crate::state::DriverState;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeLine {
        asserted: bool,
    }

    impl InterruptLine for FakeLine {
        type Error = ();

        fn listen(&mut self) -> Result<(), ()> {
            Ok(())
        }

        fn is_asserted(&mut self) -> Result<bool, ()> {
            Ok(self.asserted)
        }
    }

    struct FakeMask {
        masked: Rc<Cell<bool>>,
    }

    impl InterruptMask for FakeMask {
        fn mask(&self) {
            self.masked.set(true);
        }

        fn unmask(&self) {
            self.masked.set(false);
        }
    }

    type TestShield = Shield<FakeBridge, FakeDelay, FakeLine>;

    fn make_configured(asserted: bool) -> (TestShield, EventLog) {
        let log = new_log();
        let mut shield = Shield::with_interrupt_line(
            FakeBridge::new(log.clone()),
            FakeDelay::new(log.clone()),
            FakeLine { asserted },
        );
        let config = Config::default().with_interrupt(true).with_command_mode(false);
        shield.setup(&config).unwrap();
        shield.bus_mut().iir = 0xC4;
        (shield, log)
    }

    fn make_shared_with_line(asserted: bool) -> (SharedShield<FakeBridge, FakeDelay, FakeLine>, EventLog) {
        let (shield, log) = make_configured(asserted);
        (SharedShield::new(shield), log)
    }

    fn make_shared() -> (SharedShield<FakeBridge, FakeDelay, FakeLine>, EventLog) {
        make_shared_with_line(false)
    }

    fn make_masked(masked: Rc<Cell<bool>>) -> SharedShield<FakeBridge, FakeDelay, FakeLine, FakeMask> {
        let (shield, _log) = make_configured(false);
        SharedShield::with_mask(shield, FakeMask { masked })
    }

    #[test]
    fn test_service_interrupt_when_idle() {
        let (shared, log) = make_shared();

        assert_eq!(shared.service_interrupt(), Some(InterruptCause::RxDataReady));
        assert!(!shared.is_pending());
        assert_eq!(shared.take_deferred(), None);
        assert_eq!(log.borrow().last(), Some(&Event::Read { addr: 0x10 }));
    }

    #[test]
    fn test_interrupt_during_operation_is_deferred() {
        let (shared, log) = make_shared();

        shared.with(|shield| {
            shield.send_string("a").unwrap();
            assert_eq!(shared.service_interrupt(), None);
            assert!(shared.is_pending());
            shield.send_string("b").unwrap();
        });

        assert!(!shared.is_pending());
        assert_eq!(shared.take_deferred(), Some(InterruptCause::RxDataReady));
        assert_eq!(shared.take_deferred(), None);

        let events = log.borrow();
        let tail = &events[events.len() - 3..];
        assert_eq!(
            tail,
            &[
                Event::Write { addr: 0x00, value: b'a' },
                Event::Write { addr: 0x00, value: b'b' },
                Event::Read { addr: 0x10 },
            ]
        );
    }

    #[test]
    fn test_interrupt_masked_while_locked() {
        let masked = Rc::new(Cell::new(false));
        let shared = make_masked(masked.clone());

        shared.with(|shield| {
            assert!(masked.get());
            shield.send_string("x").unwrap();
        });

        assert!(!masked.get());
    }

    #[test]
    fn test_busy_interrupt_path_masks_until_unlock() {
        let masked = Rc::new(Cell::new(false));
        let shared = make_masked(masked.clone());

        shared.with(|_shield| {
            masked.set(false);
            assert_eq!(shared.service_interrupt(), None);
            assert!(masked.get());
        });

        assert!(!masked.get());
        assert!(!shared.is_pending());
        assert_eq!(shared.take_deferred(), Some(InterruptCause::RxDataReady));
    }

    #[test]
    fn test_deferred_bus_failure_is_recorded() {
        let (shared, _log) = make_shared();

        shared.with(|shield| {
            shield.bus_mut().fail_from = Some(0);
            assert_eq!(shared.service_interrupt(), None);
        });

        assert!(!shared.is_pending());
        assert_eq!(shared.take_deferred(), None);
        let shield = shared.into_inner();
        assert_eq!(shield.state(), DriverState::Error);
        assert!(shield.last_error().starts_with("SPI transfer error"));
    }

    #[test]
    fn test_poll_interrupt_follows_line() {
        let (quiet, _log) = make_shared();
        assert_eq!(quiet.with(|shield| shield.poll_interrupt()), Ok(None));

        let (raised, log) = make_shared_with_line(true);
        assert_eq!(
            raised.with(|shield| shield.poll_interrupt()),
            Ok(Some(InterruptCause::RxDataReady))
        );
        assert_eq!(log.borrow().last(), Some(&Event::Read { addr: 0x10 }));
    }

    #[test]
    fn test_into_inner_keeps_state() {
        let (shared, _log) = make_shared();
        let shield = shared.into_inner();
        assert!(shield.interrupt_enabled());
        assert!(shield.state().is_configured());
    }
}
