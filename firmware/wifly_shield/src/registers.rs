/// SC16C750 Register Map
/// Register identifiers, SPI wire addresses and bit-level register views

use bitfield::bitfield;

/// Direction bit OR'd into the address byte to request a read
pub const READ_FLAG: u8 = 0x80;

/// LCR value exposing DLL/DLH (divisor latch enable, everything else cleared)
pub const LCR_DIVISOR_LATCH: u8 = 0x80;

/// LCR magic value exposing the enhanced register set (EFR, XON, XOFF)
pub const LCR_ENHANCED_ACCESS: u8 = 0xBF;

/// Value written to SPR and read back to prove the chip answers
pub const SCRATCHPAD_SENTINEL: u8 = 0x55;

/// Which register bank an address refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSet {
    /// Normal operation (LCR[7] = 0)
    General,
    /// Divisor latch exposed (LCR[7] = 1)
    Special,
    /// Enhanced registers exposed (LCR = 0xBF)
    Enhanced,
}

/// Bridge chip registers
///
/// Several registers share an address and are told apart by direction (THR/RHR,
/// FCR/IIR) or by the access set selected through LCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    // General register set
    Thr,
    Rhr,
    Ier,
    Fcr,
    Iir,
    Lcr,
    Mcr,
    Lsr,
    Msr,
    Spr,
    Tcr,
    Tlr,
    TxLvl,
    RxLvl,
    IoDir,
    IoState,
    IoIntEna,
    IoControl,
    Efcr,
    // Special register set
    Dll,
    Dlh,
    // Enhanced register set
    Efr,
    Xon1,
    Xon2,
    Xoff1,
    Xoff2,
}

impl Register {
    /// 5-bit register index as listed in the datasheet
    pub const fn index(self) -> u8 {
        match self {
            Register::Thr | Register::Rhr | Register::Dll => 0x00,
            Register::Ier | Register::Dlh => 0x01,
            Register::Fcr | Register::Iir | Register::Efr => 0x02,
            Register::Lcr => 0x03,
            Register::Mcr | Register::Xon1 => 0x04,
            Register::Lsr | Register::Xon2 => 0x05,
            Register::Msr | Register::Tcr | Register::Xoff1 => 0x06,
            Register::Spr | Register::Tlr | Register::Xoff2 => 0x07,
            Register::TxLvl => 0x08,
            Register::RxLvl => 0x09,
            Register::IoDir => 0x0A,
            Register::IoState => 0x0B,
            Register::IoIntEna => 0x0C,
            Register::IoControl => 0x0E,
            Register::Efcr => 0x0F,
        }
    }

    /// Address byte as it goes on the wire: index in bits 6..3, direction bit clear
    pub const fn wire_address(self) -> u8 {
        self.index() << 3
    }

    pub const fn access_set(self) -> AccessSet {
        match self {
            Register::Dll | Register::Dlh => AccessSet::Special,
            Register::Efr | Register::Xon1 | Register::Xon2 | Register::Xoff1 | Register::Xoff2 => {
                AccessSet::Enhanced
            }
            _ => AccessSet::General,
        }
    }
}

bitfield! {
    /// Line Control Register
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct LineControl(u8);
    impl Debug;
    pub u8, word_length, set_word_length: 1, 0;
    pub two_stop_bits, set_two_stop_bits: 2;
    pub parity_enable, set_parity_enable: 3;
    pub even_parity, set_even_parity: 4;
    pub forced_parity, set_forced_parity: 5;
    pub break_control, set_break_control: 6;
    pub divisor_latch, set_divisor_latch: 7;
}

impl LineControl {
    /// 8 data bits, no parity, one stop bit
    pub fn eight_n_one() -> Self {
        let mut lcr = LineControl(0);
        lcr.set_word_length(0b11);
        lcr
    }

    pub fn divisor_latch_enabled() -> Self {
        let mut lcr = LineControl(0);
        lcr.set_divisor_latch(true);
        lcr
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

bitfield! {
    /// Line Status Register
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct LineStatus(u8);
    impl Debug;
    pub data_ready, _: 0;
    pub overrun_error, _: 1;
    pub parity_error, _: 2;
    pub framing_error, _: 3;
    pub break_interrupt, _: 4;
    pub thr_empty, _: 5;
    pub transmitter_empty, _: 6;
    pub fifo_data_error, _: 7;
}

impl From<u8> for LineStatus {
    fn from(value: u8) -> Self {
        LineStatus(value)
    }
}

bitfield! {
    /// FIFO Control Register (write only)
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct FifoControl(u8);
    impl Debug;
    pub fifo_enable, set_fifo_enable: 0;
    pub reset_rx, set_reset_rx: 1;
    pub reset_tx, set_reset_tx: 2;
    pub u8, tx_trigger, set_tx_trigger: 5, 4;
    pub u8, rx_trigger, set_rx_trigger: 7, 6;
}

impl FifoControl {
    /// Flush both FIFOs without enabling them
    pub fn reset_both() -> Self {
        let mut fcr = FifoControl(0);
        fcr.set_reset_rx(true);
        fcr.set_reset_tx(true);
        fcr
    }

    pub fn enabled() -> Self {
        let mut fcr = FifoControl(0);
        fcr.set_fifo_enable(true);
        fcr
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

bitfield! {
    /// Enhanced Feature Register
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct EnhancedFeatures(u8);
    impl Debug;
    pub u8, software_flow_control, set_software_flow_control: 3, 0;
    /// Unlocks IER[7:4], FCR[5:4] and MCR[7:5]
    pub enhanced_functions, set_enhanced_functions: 4;
    pub special_char_detect, set_special_char_detect: 5;
    pub auto_rts, set_auto_rts: 6;
    pub auto_cts, set_auto_cts: 7;
}

impl EnhancedFeatures {
    /// Enhanced functions on, flow control left to the enhanced bits it unlocks
    pub fn unlocked() -> Self {
        let mut efr = EnhancedFeatures(0);
        efr.set_enhanced_functions(true);
        efr
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}
