//! Per-step execution trace.
//!
//! An engine fills one [`RvfiTrace`] per step. The protocol engine serializes it
//! into whichever packet format the client negotiated. Register and memory
//! effects are optional: they are present only when the step produced them.

/// Register operands and result of one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntData {
    /// Value written to `rd`; zero when `rd` is `x0`.
    pub rd_wdata: u64,
    /// Value read from `rs1`.
    pub rs1_rdata: u64,
    /// Value read from `rs2`.
    pub rs2_rdata: u64,
    /// Destination register index.
    pub rd_addr: u8,
    /// First source register index.
    pub rs1_addr: u8,
    /// Second source register index.
    pub rs2_addr: u8,
}

/// Memory access performed by one step.
///
/// Data fields are 256 bits wide, stored as four little-endian 64-bit limbs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemAccess {
    /// Accessed address.
    pub addr: u64,
    /// Bytes read.
    pub rdata: [u64; 4],
    /// Bytes written.
    pub wdata: [u64; 4],
    /// One bit per byte read.
    pub rmask: u32,
    /// One bit per byte written.
    pub wmask: u32,
}

impl MemAccess {
    /// Byte mask covering the low `len` bytes.
    pub const fn mask_for(len: u32) -> u32 {
        if len >= 32 { u32::MAX } else { (1 << len) - 1 }
    }
}

/// Architectural effects of one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RvfiTrace {
    /// Retirement order; the first instruction of a session has order 0.
    pub order: u64,
    /// Instruction encoding.
    pub insn: u64,
    /// Non-zero when the instruction trapped.
    pub trap: u8,
    /// Non-zero on the final packet of a trace.
    pub halt: u8,
    /// Non-zero for the first instruction of a trap handler.
    pub intr: u8,
    /// Privilege mode the instruction executed in.
    pub mode: u8,
    /// `MXL` encoding of the active register width.
    pub ixl: u8,
    /// Non-zero when the record describes an executed instruction.
    pub valid: u8,
    /// PC of the instruction.
    pub pc_rdata: u64,
    /// PC of the next instruction.
    pub pc_wdata: u64,
    /// Register effects.
    pub int_data: Option<IntData>,
    /// Memory effects.
    pub mem_access: Option<MemAccess>,
}
