#![no_std]
#![no_main]

use panic_halt as _;

use cortex_m_rt::entry;

use atsamd_hal as hal;
use hal::clock::GenericClockController;
use hal::delay::Delay;
use hal::gpio::Pins;
use hal::pac::{CorePeripherals, Peripherals};
use hal::prelude::*;
use hal::sercom::{spi, IoSet1, Sercom1};

use usb_device::prelude::*;
use usbd_serial::{SerialPort, USB_CLASS_CDC};
use usb_device::bus::UsbBusAllocator;

use log::LevelFilter;

use wifly_shield::logger;
use wifly_shield::{ChipSelect, ClockRate, Config, LevelLowPin, Shield};

/// Debug output macro for USB-CDC serial
macro_rules! debug_write {
    ($serial:expr, $($arg:tt)*) => {{
        use core::fmt::Write;
        let mut buffer = heapless::String::<256>::new();
        let _ = write!(&mut buffer, $($arg)*);
        let _ = $serial.write(buffer.as_bytes());
    }};
}

/// Roughly 1 ms at the 48 MHz core clock
const LOOP_DELAY_CYCLES: u32 = 48_000;

/// Longest command line accepted from the host
const MAX_COMMAND_LEN: usize = 128;

/// Console-only command: rerun bridge setup instead of forwarding
const SETUP_COMMAND: &str = "!setup";

#[entry]
fn main() -> ! {
    // Get peripheral instances
    let mut peripherals = Peripherals::take().unwrap();
    let core = CorePeripherals::take().unwrap();

    // Configure clocks
    let mut clocks = GenericClockController::with_internal_32kosc(
        peripherals.GCLK,
        &mut peripherals.MCLK,
        &mut peripherals.OSC32KCTRL,
        &mut peripherals.OSCCTRL,
        &mut peripherals.NVMCTRL,
    );

    let delay = Delay::new(core.SYST, &mut clocks);

    // Queued until USB is up, then drained to the console
    let _ = logger::init(LevelFilter::Debug);

    // Configure pins
    let pins = Pins::new(peripherals.PORT);

    // =======================================================================
    // USB CDC-ACM Setup (Host PC Console)
    // =======================================================================

    static mut USB_BUS: Option<UsbBusAllocator<hal::usb::UsbBus>> = None;

    unsafe {
        let mut gclk0 = clocks.gclk0();
        let usb_bus = hal::usb::UsbBus::new(
            &clocks.usb(&mut gclk0).unwrap(),
            &mut peripherals.MCLK,
            pins.pa24,  // USB D-
            pins.pa25,  // USB D+
            peripherals.USB,
        );
        USB_BUS = Some(UsbBusAllocator::new(usb_bus));
    }

    let bus_allocator = unsafe { USB_BUS.as_ref().unwrap() };

    let mut serial = SerialPort::new(bus_allocator);

    let mut usb_dev = UsbDeviceBuilder::new(bus_allocator, UsbVidPid(0x1d50, 0x615c))
        .manufacturer("WiFly Shield")
        .product("WiFly Command Console")
        .serial_number("WIFLY-001")
        .device_class(USB_CLASS_CDC)
        .build();

    let mut usb_configured = false;
    let mut startup_sent = false;

    // =======================================================================
    // SPI Setup (SC16C750 bridge on SERCOM1)
    // =======================================================================
    // PA16 MOSI, PA17 SCK, PA19 MISO, PA18 chip select, PA20 bridge /IRQ
    // Mode 0 (clock idle low, sample on rising edge) at 1 MHz

    let gclk0 = clocks.gclk0();
    let sercom_clock = clocks.sercom1_core(&gclk0).unwrap();
    let pads = spi::Pads::<Sercom1, IoSet1>::default()
        .data_out(pins.pa16)
        .sclk(pins.pa17)
        .data_in(pins.pa19);
    let spi = spi::Config::new(&peripherals.MCLK, peripherals.SERCOM1, pads, sercom_clock.freq())
        .baud(1.MHz())
        .spi_mode(spi::MODE_0)
        .enable();

    let cs = pins.pa18.into_push_pull_output();
    let irq = LevelLowPin::new(pins.pa20.into_pull_up_input());

    // =======================================================================
    // Bridge + Module Setup (run once the host has enumerated us)
    // =======================================================================

    let mut shield = Shield::with_interrupt_line(ChipSelect::new(spi, cs), delay, irq);
    let config = Config::new(ClockRate::Xtal14Mhz, 3) // 9600, the module's factory rate
        .with_interrupt(true)
        .with_command_mode(true);

    // Status LED
    let mut led = pins.pa15.into_push_pull_output();
    led.set_high().unwrap();

    // =======================================================================
    // Main Loop
    // =======================================================================

    let mut rx_buffer = [0u8; 64];
    let mut line = heapless::String::<MAX_COMMAND_LEN>::new();
    let mut loop_counter: u32 = 0;
    let mut last_usb_state = usb_dev.state();

    loop {
        loop_counter = loop_counter.wrapping_add(1);

        // Poll USB and detect state changes
        let poll_result = usb_dev.poll(&mut [&mut serial]);
        let current_usb_state = usb_dev.state();

        if current_usb_state != last_usb_state {
            last_usb_state = current_usb_state;
            match current_usb_state {
                UsbDeviceState::Default => {
                    usb_configured = false;
                    startup_sent = false;
                }
                UsbDeviceState::Configured => {
                    usb_configured = true;
                }
                _ => {}
            }
        }

        // Bring up the bridge and send the startup banner once after configuration
        if usb_configured && !startup_sent {
            startup_sent = true;
            let setup_ok = shield.setup(&config).is_ok();
            debug_write!(serial, "\r\n");
            debug_write!(serial, "========================================\r\n");
            debug_write!(serial, "WiFly Shield Console v0.1.0\r\n");
            debug_write!(serial, "========================================\r\n");
            if setup_ok {
                if let Some(baud) = shield.baud_rate() {
                    debug_write!(serial, "[INIT] Bridge: {} bps\r\n", baud.bps());
                }
                debug_write!(serial, "[INIT] State: {:?}\r\n", shield.state());
            } else {
                debug_write!(serial, "[ERROR] {}\r\n", shield.last_error());
                debug_write!(serial, "[INIT] Send {} to retry\r\n", SETUP_COMMAND);
            }
            debug_write!(serial, "[INIT] Ready for commands\r\n\r\n");
        }

        if poll_result {
            match serial.read(&mut rx_buffer) {
                Ok(count) if count > 0 => {
                    for &byte in &rx_buffer[..count] {
                        if byte == b'\r' || byte == b'\n' {
                            if !line.is_empty() {
                                forward_line(&mut shield, &mut serial, &config, line.as_str());
                                line.clear();
                            }
                        } else if line.push(byte as char).is_err() {
                            debug_write!(serial, "[WARN] Command too long, dropped\r\n");
                            line.clear();
                        }
                    }
                }
                Ok(_) => {}
                Err(UsbError::WouldBlock) => {}
                Err(e) => {
                    debug_write!(serial, "[ERROR] USB read failed: {:?}\r\n", e);
                }
            }
        }

        if shield.state().is_configured() {
            // Forward whatever the module said
            match shield.read_response() {
                Ok(response) if !response.is_empty() => {
                    debug_write!(serial, "[WIFLY] {}\r\n", response.as_str());
                    led.toggle().ok();
                }
                Ok(_) => {}
                Err(_) => {
                    debug_write!(serial, "[ERROR] {}\r\n", shield.last_error());
                }
            }

            if let Ok(Some(cause)) = shield.poll_interrupt() {
                debug_write!(serial, "[IRQ] {:?}\r\n", cause);
            }
        }

        // Library log output
        if usb_configured {
            while let Some(entry) = logger::pop() {
                debug_write!(serial, "{}\r\n", entry.as_str());
            }
            let dropped = logger::take_dropped();
            if dropped > 0 {
                debug_write!(serial, "[WARN] {} log lines dropped\r\n", dropped);
            }
        }

        // Periodic status (every ~10000 loops)
        if loop_counter % 10000 == 0 && usb_configured {
            debug_write!(serial, "[HEARTBEAT] Loop={}, Bridge={:?}\r\n", loop_counter, shield.state());
        }

        cortex_m::asm::delay(LOOP_DELAY_CYCLES);
    }
}

/// Host line to module: "$$$" switches to command mode, "!setup" reruns
/// bridge setup, anything else is a command
fn forward_line<S, D, L>(
    shield: &mut Shield<S, D, L>,
    serial: &mut SerialPort<'_, hal::usb::UsbBus>,
    config: &Config,
    line: &str,
) where
    S: wifly_shield::BridgeBus,
    D: embedded_hal::blocking::delay::DelayMs<u16>,
    L: wifly_shield::InterruptLine,
{
    let result = if line == SETUP_COMMAND {
        shield.setup(config)
    } else if line == "$$$" {
        shield.enter_command_mode()
    } else {
        shield.send_command(line)
    };

    match result {
        Ok(()) => debug_write!(serial, "[CMD] {}\r\n", line),
        Err(_) => debug_write!(serial, "[ERROR] {}\r\n", shield.last_error()),
    }
}
