/// Interrupt Cause Decoder
/// Maps the SC16C750 IIR reading onto a priority-ordered cause table

use embedded_hal::digital::v2::InputPin;
use num_enum::IntoPrimitive;

use crate::bus::BridgeBus;
use crate::registers::Register;
use crate::transport::RegisterTransport;

/// IIR bits that identify the source
pub const IIR_CAUSE_MASK: u8 = 0x3F;

/// Interrupt sources, discriminant is the IIR cause code
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u8)]
pub enum InterruptCause {
    NoInterrupt = 0b000001,
    RxLineError = 0b000110,
    RxTimeout = 0b001100,
    RxDataReady = 0b000100,
    TxHoldingEmpty = 0b000010,
    ModemStatus = 0b000000,
    IoPins = 0b110000,
    Xoff = 0b010000,
    CtsRts = 0b100000,
}

/// Highest priority first
pub const CAUSE_TABLE: [InterruptCause; 9] = [
    InterruptCause::NoInterrupt,
    InterruptCause::RxLineError,
    InterruptCause::RxTimeout,
    InterruptCause::RxDataReady,
    InterruptCause::TxHoldingEmpty,
    InterruptCause::ModemStatus,
    InterruptCause::IoPins,
    InterruptCause::Xoff,
    InterruptCause::CtsRts,
];

impl InterruptCause {
    pub fn code(self) -> u8 {
        self.into()
    }

    /// Position in `CAUSE_TABLE`, 0 being the highest priority
    pub fn priority(self) -> usize {
        CAUSE_TABLE
            .iter()
            .position(|&cause| cause == self)
            .unwrap_or(CAUSE_TABLE.len())
    }
}

/// First table entry whose code equals the masked IIR value
pub fn decode(iir: u8) -> Option<InterruptCause> {
    let code = iir & IIR_CAUSE_MASK;
    CAUSE_TABLE.iter().copied().find(|cause| cause.code() == code)
}

/// Read IIR and decode it
pub fn read_cause<B: BridgeBus>(
    transport: &mut RegisterTransport<B>,
) -> Result<Option<InterruptCause>, B::Error> {
    let iir = transport.read_register(Register::Iir)?;
    let cause = decode(iir);
    if cause.is_none() {
        log::trace!("unrecognised IIR 0x{:02X}", iir);
    }
    Ok(cause)
}

/// Action taken for a decoded cause
pub type InterruptHandler = fn(InterruptCause);

/// The bridge /IRQ output as seen by the host
pub trait InterruptLine {
    type Error: core::fmt::Debug;

    /// Start watching the line; called once from setup
    fn listen(&mut self) -> Result<(), Self::Error>;

    /// Whether the bridge is currently requesting service
    fn is_asserted(&mut self) -> Result<bool, Self::Error>;
}

/// Open-drain /IRQ on an input pin with pull-up; asserted while low
pub struct LevelLowPin<P> {
    pin: P,
    listening: bool,
}

impl<P: InputPin> LevelLowPin<P> {
    pub fn new(pin: P) -> Self {
        LevelLowPin { pin, listening: false }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P> InterruptLine for LevelLowPin<P>
where
    P: InputPin,
    P::Error: core::fmt::Debug,
{
    type Error = P::Error;

    fn listen(&mut self) -> Result<(), P::Error> {
        // A pin that cannot be sampled cannot be listened on
        self.pin.is_low()?;
        self.listening = true;
        Ok(())
    }

    fn is_asserted(&mut self) -> Result<bool, P::Error> {
        if !self.listening {
            return Ok(false);
        }
        self.pin.is_low()
    }
}

/// Boards without the /IRQ line wired
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterruptLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineUnavailable;

impl InterruptLine for NoInterruptLine {
    type Error = LineUnavailable;

    fn listen(&mut self) -> Result<(), LineUnavailable> {
        Err(LineUnavailable)
    }

    fn is_asserted(&mut self) -> Result<bool, LineUnavailable> {
        Ok(false)
    }
}
