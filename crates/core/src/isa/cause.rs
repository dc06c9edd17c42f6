//! Synchronous trap causes.
//!
//! A [`Trap`] is a guest-visible exception. The reference engine turns it into an
//! `mcause`/`mtval` update and a jump to `mtvec`; it is never an engine fault.

/// Exception code values written to `mcause`.
pub mod exception {
    /// Instruction address misaligned.
    pub const INSTRUCTION_ADDRESS_MISALIGNED: u64 = 0;
    /// Instruction access fault.
    pub const INSTRUCTION_ACCESS_FAULT: u64 = 1;
    /// Illegal instruction.
    pub const ILLEGAL_INSTRUCTION: u64 = 2;
    /// Breakpoint.
    pub const BREAKPOINT: u64 = 3;
    /// Load address misaligned.
    pub const LOAD_ADDRESS_MISALIGNED: u64 = 4;
    /// Load access fault.
    pub const LOAD_ACCESS_FAULT: u64 = 5;
    /// Store/AMO address misaligned.
    pub const STORE_ADDRESS_MISALIGNED: u64 = 6;
    /// Store/AMO access fault.
    pub const STORE_ACCESS_FAULT: u64 = 7;
    /// Environment call from M-mode.
    pub const ENVIRONMENT_CALL_FROM_M_MODE: u64 = 11;
}

/// Machine timer interrupt cause, without the interrupt bit.
pub const MACHINE_TIMER_INTERRUPT: u64 = 7;

/// A synchronous exception raised while executing one instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trap {
    /// PC not aligned to the instruction size; holds the target address.
    InstructionAddressMisaligned(u64),
    /// Fetch outside executable memory; holds the PC.
    InstructionAccessFault(u64),
    /// Unsupported or malformed encoding; holds the instruction bits.
    IllegalInstruction(u32),
    /// EBREAK; holds the PC.
    Breakpoint(u64),
    /// Misaligned load; holds the address.
    LoadAddressMisaligned(u64),
    /// Load outside readable memory; holds the address.
    LoadAccessFault(u64),
    /// Misaligned store or AMO; holds the address.
    StoreAddressMisaligned(u64),
    /// Store or AMO outside writable memory; holds the address.
    StoreAccessFault(u64),
    /// ECALL from machine mode.
    EnvironmentCallFromMMode,
}

impl Trap {
    /// Value written to `mcause`.
    pub const fn cause(self) -> u64 {
        match self {
            Self::InstructionAddressMisaligned(_) => exception::INSTRUCTION_ADDRESS_MISALIGNED,
            Self::InstructionAccessFault(_) => exception::INSTRUCTION_ACCESS_FAULT,
            Self::IllegalInstruction(_) => exception::ILLEGAL_INSTRUCTION,
            Self::Breakpoint(_) => exception::BREAKPOINT,
            Self::LoadAddressMisaligned(_) => exception::LOAD_ADDRESS_MISALIGNED,
            Self::LoadAccessFault(_) => exception::LOAD_ACCESS_FAULT,
            Self::StoreAddressMisaligned(_) => exception::STORE_ADDRESS_MISALIGNED,
            Self::StoreAccessFault(_) => exception::STORE_ACCESS_FAULT,
            Self::EnvironmentCallFromMMode => exception::ENVIRONMENT_CALL_FROM_M_MODE,
        }
    }

    /// Value written to `mtval`.
    ///
    /// Illegal-instruction traps report the encoding only when the platform
    /// says `mtval` carries it.
    pub const fn tval(self, illegal_inst_bits: bool) -> u64 {
        match self {
            Self::InstructionAddressMisaligned(addr)
            | Self::InstructionAccessFault(addr)
            | Self::Breakpoint(addr)
            | Self::LoadAddressMisaligned(addr)
            | Self::LoadAccessFault(addr)
            | Self::StoreAddressMisaligned(addr)
            | Self::StoreAccessFault(addr) => addr,
            Self::IllegalInstruction(bits) if illegal_inst_bits => bits as u64,
            Self::IllegalInstruction(_) | Self::EnvironmentCallFromMMode => 0,
        }
    }
}
