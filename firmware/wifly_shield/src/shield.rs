/// WiFly Shield Driver
/// Setup, command exchange and interrupt servicing on top of the bridge chip

use embedded_hal::blocking::delay::DelayMs;
use heapless::String;

use crate::baud::{BaudRate, ClockRate};
use crate::bus::BridgeBus;
use crate::channel;
use crate::command::{self, Response, EXIT_COMMAND, REBOOT_COMMAND};
use crate::config::Config;
use crate::configure::configure;
use crate::error::{capture, Error, ERROR_CAPACITY};
use crate::interrupt::{self, InterruptCause, InterruptHandler, InterruptLine, NoInterruptLine};
use crate::state::DriverState;
use crate::transport::RegisterTransport;

pub struct Shield<B, D, L = NoInterruptLine> {
    transport: RegisterTransport<B>,
    delay: D,
    irq: L,
    irq_enabled: bool,
    handler: Option<InterruptHandler>,
    state: DriverState,
    clock_rate: Option<ClockRate>,
    baud_rate: Option<BaudRate>,
    last_error: String<ERROR_CAPACITY>,
}

impl<B, D> Shield<B, D, NoInterruptLine>
where
    B: BridgeBus,
    D: DelayMs<u16>,
{
    /// Driver for a board without the /IRQ line wired
    pub fn new(bus: B, delay: D) -> Self {
        Shield::with_interrupt_line(bus, delay, NoInterruptLine)
    }
}

impl<B, D, L> Shield<B, D, L>
where
    B: BridgeBus,
    D: DelayMs<u16>,
    L: InterruptLine,
{
    pub fn with_interrupt_line(bus: B, delay: D, irq: L) -> Self {
        Shield {
            transport: RegisterTransport::new(bus),
            delay,
            irq,
            irq_enabled: false,
            handler: None,
            state: DriverState::new(),
            clock_rate: None,
            baud_rate: None,
            last_error: String::new(),
        }
    }

    /// Bring up the bus, configure the bridge and optionally the interrupt
    /// line and command mode
    ///
    /// Stops at the first failure, leaving the driver in `DriverState::Error`
    /// with the reason in `last_error()`. Calling again starts over.
    pub fn setup(&mut self, config: &Config) -> Result<(), Error<B::Error>> {
        self.state.advance(DriverState::Unconfigured);
        self.last_error.clear();
        self.irq_enabled = false;
        self.clock_rate = None;
        self.baud_rate = None;

        let result = self.run_setup(config);
        if let Err(ref e) = result {
            self.state.fail();
            self.last_error = capture(e);
            log::error!("setup failed: {}", self.last_error);
        }
        result
    }

    fn run_setup(&mut self, config: &Config) -> Result<(), Error<B::Error>> {
        if BaudRate::from_index(config.baud_index).is_none() {
            return Err(Error::InvalidBaudRate(config.baud_index));
        }

        self.transport.init().map_err(Error::BusInit)?;
        self.state.advance(DriverState::BusReady);
        log::debug!("bus ready");

        let baud = configure(&mut self.transport, config.clock_rate, config.baud_index)?;
        self.clock_rate = Some(config.clock_rate);
        self.baud_rate = Some(baud);
        self.state.advance(DriverState::BridgeConfigured);

        if config.enable_interrupt {
            self.irq.listen().map_err(|e| {
                log::error!("interrupt line: {:?}", e);
                Error::InterruptInit
            })?;
            self.irq_enabled = true;
            log::debug!("listening on /IRQ");
        }

        if config.enter_command_mode {
            self.enter_command_mode()?;
        }
        Ok(())
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Most recent failure message, empty when none
    pub fn last_error(&self) -> &str {
        self.last_error.as_str()
    }

    pub fn clock_rate(&self) -> Option<ClockRate> {
        self.clock_rate
    }

    /// Rate programmed by the last successful configuration
    pub fn baud_rate(&self) -> Option<BaudRate> {
        self.baud_rate
    }

    /// Send "$$$" and wait out the settling window
    pub fn enter_command_mode(&mut self) -> Result<(), Error<B::Error>> {
        self.require_configured()?;
        let result = command::enter_command_mode(&mut self.transport, &mut self.delay).map_err(Error::Bus);
        self.record(result)?;
        self.state.advance(DriverState::CommandModeEntered);
        Ok(())
    }

    /// Send "exit", returning the module to data mode
    pub fn exit_command_mode(&mut self) -> Result<(), Error<B::Error>> {
        self.send_command(EXIT_COMMAND)?;
        self.state.advance(DriverState::BridgeConfigured);
        Ok(())
    }

    /// Restart the module; it comes back in data mode
    pub fn reboot(&mut self) -> Result<(), Error<B::Error>> {
        self.send_command(REBOOT_COMMAND)?;
        self.state.advance(DriverState::BridgeConfigured);
        Ok(())
    }

    pub fn send_string(&mut self, text: &str) -> Result<(), Error<B::Error>> {
        self.require_configured()?;
        let result = command::send_string(&mut self.transport, text).map_err(Error::Bus);
        self.record(result)
    }

    pub fn send_command(&mut self, text: &str) -> Result<(), Error<B::Error>> {
        self.require_configured()?;
        let result = command::send_command(&mut self.transport, text).map_err(Error::Bus);
        self.record(result)
    }

    /// Whatever printable text is buffered right now; does not wait
    pub fn read_response(&mut self) -> Result<Response, Error<B::Error>> {
        self.require_configured()?;
        let result = command::read_response(&mut self.transport).map_err(Error::Bus);
        self.record(result)
    }

    pub fn rx_level(&mut self) -> Result<u8, Error<B::Error>> {
        self.require_configured()?;
        let result = channel::rx_level(&mut self.transport).map_err(Error::Bus);
        self.record(result)
    }

    pub fn tx_level(&mut self) -> Result<u8, Error<B::Error>> {
        self.require_configured()?;
        let result = channel::tx_level(&mut self.transport).map_err(Error::Bus);
        self.record(result)
    }

    /// Install the action run for each decoded interrupt cause
    pub fn set_interrupt_handler(&mut self, handler: InterruptHandler) {
        self.handler = Some(handler);
    }

    pub fn clear_interrupt_handler(&mut self) {
        self.handler = None;
    }

    /// Identify why the bridge raised /IRQ and hand the cause to the handler
    ///
    /// Codes outside the cause table are ignored.
    pub fn on_interrupt(&mut self) -> Result<Option<InterruptCause>, Error<B::Error>> {
        self.require_configured()?;
        let result = interrupt::read_cause(&mut self.transport).map_err(Error::Bus);
        let cause = self.record(result)?;

        if let (Some(cause), Some(handler)) = (cause, self.handler) {
            handler(cause);
        }
        Ok(cause)
    }

    /// Sample the interrupt line and service it if asserted
    pub fn poll_interrupt(&mut self) -> Result<Option<InterruptCause>, Error<B::Error>> {
        if !self.irq_enabled {
            return Ok(None);
        }
        match self.irq.is_asserted() {
            Ok(true) => self.on_interrupt(),
            Ok(false) => Ok(None),
            Err(e) => {
                log::warn!("interrupt line unreadable: {:?}", e);
                Ok(None)
            }
        }
    }

    pub fn interrupt_enabled(&self) -> bool {
        self.irq_enabled
    }

    pub fn release(self) -> (B, D, L) {
        (self.transport.release(), self.delay, self.irq)
    }

    #[cfg(test)]
    pub(crate) fn bus(&self) -> &B {
        self.transport.bus()
    }

    #[cfg(test)]
    pub(crate) fn bus_mut(&mut self) -> &mut B {
        self.transport.bus_mut()
    }

    fn require_configured(&mut self) -> Result<(), Error<B::Error>> {
        if self.state.is_configured() {
            Ok(())
        } else {
            let e = Error::NotConfigured;
            self.last_error = capture(&e);
            Err(e)
        }
    }

    /// Capture a bus failure; register state is unknown after one
    fn record<T>(&mut self, result: Result<T, Error<B::Error>>) -> Result<T, Error<B::Error>> {
        if let Err(ref e) = result {
            self.last_error = capture(e);
            self.state.fail();
            log::error!("{}", self.last_error);
        }
        result
    }
}
