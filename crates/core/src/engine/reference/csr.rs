//! Machine-mode Control and Status Registers.
//!
//! The reference engine implements only the machine-level CSRs a bare-metal test
//! needs: trap setup and handling, identification, and the cycle/instret counters.
//! An access to any other address is an illegal instruction.

use crate::config::{CsrConfig, Xlen};

/// Machine vendor ID.
pub const MVENDORID: u16 = 0xF11;
/// Machine architecture ID.
pub const MARCHID: u16 = 0xF12;
/// Machine implementation ID.
pub const MIMPID: u16 = 0xF13;
/// Hart ID.
pub const MHARTID: u16 = 0xF14;
/// Machine status.
pub const MSTATUS: u16 = 0x300;
/// ISA and extensions.
pub const MISA: u16 = 0x301;
/// Exception delegation.
pub const MEDELEG: u16 = 0x302;
/// Interrupt delegation.
pub const MIDELEG: u16 = 0x303;
/// Interrupt enable.
pub const MIE: u16 = 0x304;
/// Trap vector base.
pub const MTVEC: u16 = 0x305;
/// Counter inhibit.
pub const MCOUNTINHIBIT: u16 = 0x320;
/// Scratch.
pub const MSCRATCH: u16 = 0x340;
/// Exception PC.
pub const MEPC: u16 = 0x341;
/// Trap cause.
pub const MCAUSE: u16 = 0x342;
/// Trap value.
pub const MTVAL: u16 = 0x343;
/// Interrupt pending.
pub const MIP: u16 = 0x344;
/// Cycle counter.
pub const MCYCLE: u16 = 0xB00;
/// Retired-instruction counter.
pub const MINSTRET: u16 = 0xB02;
/// Upper half of `mcycle` (RV32).
pub const MCYCLEH: u16 = 0xB80;
/// Upper half of `minstret` (RV32).
pub const MINSTRETH: u16 = 0xB82;
/// Read-only shadow of `mcycle`.
pub const CYCLE: u16 = 0xC00;
/// Read-only shadow of `minstret`.
pub const INSTRET: u16 = 0xC02;
/// Read-only shadow of `mcycleh` (RV32).
pub const CYCLEH: u16 = 0xC80;
/// Read-only shadow of `minstreth` (RV32).
pub const INSTRETH: u16 = 0xC82;

/// `mstatus.MIE`.
pub const MSTATUS_MIE: u64 = 1 << 3;
/// `mstatus.MPIE`.
pub const MSTATUS_MPIE: u64 = 1 << 7;
/// `mstatus.MPP`, hardwired to machine mode.
pub const MSTATUS_MPP: u64 = 0b11 << 11;

/// `mip`/`mie` machine software interrupt bit.
pub const MIP_MSIP: u64 = 1 << 3;
/// `mip`/`mie` machine timer interrupt bit.
pub const MIP_MTIP: u64 = 1 << 7;
/// `mip`/`mie` machine external interrupt bit.
pub const MIP_MEIP: u64 = 1 << 11;

/// Interrupt bits implemented in `mip` and `mie`.
const MI_MASK: u64 = MIP_MSIP | MIP_MTIP | MIP_MEIP;

/// `misa` extension bits for I, M and A.
const MISA_EXTENSIONS: u64 = (1 << (b'I' - b'A')) | (1 << (b'M' - b'A')) | (1 << (b'A' - b'A'));

/// Machine-mode CSR state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Csrs {
    /// `mstatus`.
    pub mstatus: u64,
    /// `medeleg`.
    pub medeleg: u64,
    /// `mideleg`.
    pub mideleg: u64,
    /// `mie`.
    pub mie: u64,
    /// `mip`.
    pub mip: u64,
    /// `mtvec`.
    pub mtvec: u64,
    /// `mcountinhibit`.
    pub mcountinhibit: u64,
    /// `mscratch`.
    pub mscratch: u64,
    /// `mepc`.
    pub mepc: u64,
    /// `mcause`.
    pub mcause: u64,
    /// `mtval`.
    pub mtval: u64,
    /// `mcycle`.
    pub mcycle: u64,
    /// `minstret`.
    pub minstret: u64,
    masks: CsrMasks,
    xlen: Xlen,
}

/// Writable-bit masks taken from the platform configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CsrMasks {
    medeleg: u64,
    mideleg: u64,
    force_countinhibit: u64,
}

impl Csrs {
    /// Reset state for a hart of width `xlen`.
    pub fn new(xlen: Xlen, config: &CsrConfig) -> Self {
        Self {
            mstatus: MSTATUS_MPP,
            mcountinhibit: config.force_countinhibit_bits,
            masks: CsrMasks {
                medeleg: config.medeleg_writable_bits,
                mideleg: config.mideleg_writable_bits,
                force_countinhibit: config.force_countinhibit_bits,
            },
            xlen,
            ..Self::default()
        }
    }

    /// `misa` for the configured width.
    pub const fn misa(&self) -> u64 {
        let mxl = self.xlen.mxl() as u64;
        (mxl << (self.xlen.bits() - 2)) | MISA_EXTENSIONS
    }

    /// Whether `addr` is in the read-only CSR space.
    pub const fn is_read_only(addr: u16) -> bool {
        (addr >> 10) & 0b11 == 0b11
    }

    /// Reads a CSR; `None` if it is not implemented.
    pub fn read(&self, addr: u16) -> Option<u64> {
        let rv32 = self.xlen == Xlen::Rv32;
        let value = match addr {
            MVENDORID | MARCHID | MIMPID | MHARTID => 0,
            MSTATUS => self.mstatus,
            MISA => self.misa(),
            MEDELEG => self.medeleg,
            MIDELEG => self.mideleg,
            MIE => self.mie,
            MIP => self.mip,
            MTVEC => self.mtvec,
            MCOUNTINHIBIT => self.mcountinhibit,
            MSCRATCH => self.mscratch,
            MEPC => self.mepc,
            MCAUSE => self.mcause,
            MTVAL => self.mtval,
            MCYCLE | CYCLE => self.mcycle,
            MINSTRET | INSTRET => self.minstret,
            MCYCLEH | CYCLEH if rv32 => self.mcycle >> 32,
            MINSTRETH | INSTRETH if rv32 => self.minstret >> 32,
            _ => return None,
        };
        Some(value & self.xlen.mask())
    }

    /// Writes a CSR; `None` if it is not implemented or is read-only.
    pub fn write(&mut self, addr: u16, value: u64) -> Option<()> {
        let value = value & self.xlen.mask();
        let rv32 = self.xlen == Xlen::Rv32;
        match addr {
            MSTATUS => {
                self.mstatus = (value & (MSTATUS_MIE | MSTATUS_MPIE)) | MSTATUS_MPP;
            }
            MISA | MIP => {}
            MEDELEG => self.medeleg = value & self.masks.medeleg,
            MIDELEG => self.mideleg = value & self.masks.mideleg,
            MIE => self.mie = value & MI_MASK,
            MTVEC => self.mtvec = value & !0b11,
            MCOUNTINHIBIT => self.mcountinhibit = value | self.masks.force_countinhibit,
            MSCRATCH => self.mscratch = value,
            MEPC => self.mepc = value & !0b11,
            MCAUSE => self.mcause = value,
            MTVAL => self.mtval = value,
            MCYCLE if rv32 => self.mcycle = (self.mcycle & !0xFFFF_FFFF) | value,
            MCYCLE => self.mcycle = value,
            MINSTRET if rv32 => self.minstret = (self.minstret & !0xFFFF_FFFF) | value,
            MINSTRET => self.minstret = value,
            MCYCLEH if rv32 => self.mcycle = (self.mcycle & 0xFFFF_FFFF) | (value << 32),
            MINSTRETH if rv32 => self.minstret = (self.minstret & 0xFFFF_FFFF) | (value << 32),
            _ => return None,
        }
        Some(())
    }
}
