/// SPI Bus Capability
/// The byte-level exchange the bridge driver is built on

use embedded_hal::blocking::spi::{Transfer, Write};
use embedded_hal::digital::v2::OutputPin;

/// Atomic byte exchanges with the bridge chip
///
/// Every call is one complete chip-select framed transaction.
pub trait BridgeBus {
    type Error: core::fmt::Debug;

    /// Bring the bus into its idle state before first use
    fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Clock `data` out, discarding whatever comes back
    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Clock `data` out and replace it in place with the bytes read back
    fn exchange(&mut self, data: &mut [u8]) -> Result<(), Self::Error>;
}

/// Failure on either side of a chip-select framed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiError<S, P> {
    Spi(S),
    ChipSelect(P),
}

/// Blocking embedded-hal SPI master with a software chip select (active low)
pub struct ChipSelect<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> ChipSelect<SPI, CS> {
    pub fn new(spi: SPI, cs: CS) -> Self {
        ChipSelect { spi, cs }
    }

    /// Give back the SPI peripheral and the chip-select pin
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS, P> ChipSelect<SPI, CS>
where
    CS: OutputPin<Error = P>,
{
    fn framed<T, S>(
        &mut self,
        op: impl FnOnce(&mut SPI) -> Result<T, S>,
    ) -> Result<T, SpiError<S, P>> {
        self.cs.set_low().map_err(SpiError::ChipSelect)?;
        let result = op(&mut self.spi).map_err(SpiError::Spi);
        // Deselect even when the transfer failed
        let released = self.cs.set_high().map_err(SpiError::ChipSelect);
        let value = result?;
        released?;
        Ok(value)
    }
}

impl<SPI, CS, S, P> BridgeBus for ChipSelect<SPI, CS>
where
    SPI: Transfer<u8, Error = S> + Write<u8, Error = S>,
    CS: OutputPin<Error = P>,
    S: core::fmt::Debug,
    P: core::fmt::Debug,
{
    type Error = SpiError<S, P>;

    fn init(&mut self) -> Result<(), Self::Error> {
        self.cs.set_high().map_err(SpiError::ChipSelect)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.framed(|spi| spi.write(data))
    }

    fn exchange(&mut self, data: &mut [u8]) -> Result<(), Self::Error> {
        self.framed(|spi| spi.transfer(data).map(|_| ()))
    }
}
