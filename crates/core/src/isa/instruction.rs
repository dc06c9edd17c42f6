//! Instruction field extraction.
//!
//! Every 32-bit RISC-V encoding places `opcode`, `rd`, `funct3`, `rs1`, `rs2`
//! and `funct7` at fixed bit positions. The [`InstructionBits`] trait pulls those
//! fields out of a raw `u32`.

/// Mask for the 7-bit major opcode.
pub const OPCODE_MASK: u32 = 0x7F;
/// Mask for a 5-bit register index.
pub const REG_MASK: u32 = 0x1F;
/// Mask for `funct3`.
pub const FUNCT3_MASK: u32 = 0x7;
/// Mask for `funct7`.
pub const FUNCT7_MASK: u32 = 0x7F;
/// Mask for the 12-bit CSR address.
pub const CSR_MASK: u32 = 0xFFF;

/// Field accessors for a 32-bit instruction encoding.
pub trait InstructionBits {
    /// Major opcode (bits 6:0).
    fn opcode(&self) -> u32;
    /// Destination register (bits 11:7).
    fn rd(&self) -> usize;
    /// First source register (bits 19:15).
    fn rs1(&self) -> usize;
    /// Second source register (bits 24:20).
    fn rs2(&self) -> usize;
    /// `funct3` (bits 14:12).
    fn funct3(&self) -> u32;
    /// `funct7` (bits 31:25).
    fn funct7(&self) -> u32;
    /// `funct5` of AMO encodings (bits 31:27).
    fn funct5(&self) -> u32;
    /// CSR address (bits 31:20).
    fn csr(&self) -> u16;
}

impl InstructionBits for u32 {
    #[inline(always)]
    fn opcode(&self) -> u32 {
        self & OPCODE_MASK
    }

    #[inline(always)]
    fn rd(&self) -> usize {
        ((self >> 7) & REG_MASK) as usize
    }

    #[inline(always)]
    fn rs1(&self) -> usize {
        ((self >> 15) & REG_MASK) as usize
    }

    #[inline(always)]
    fn rs2(&self) -> usize {
        ((self >> 20) & REG_MASK) as usize
    }

    #[inline(always)]
    fn funct3(&self) -> u32 {
        (self >> 12) & FUNCT3_MASK
    }

    #[inline(always)]
    fn funct7(&self) -> u32 {
        (self >> 25) & FUNCT7_MASK
    }

    #[inline(always)]
    fn funct5(&self) -> u32 {
        self >> 27
    }

    #[inline(always)]
    fn csr(&self) -> u16 {
        ((self >> 20) & CSR_MASK) as u16
    }
}

/// An instruction split into its fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Raw encoding.
    pub raw: u32,
    /// Major opcode.
    pub opcode: u32,
    /// Destination register index.
    pub rd: usize,
    /// First source register index.
    pub rs1: usize,
    /// Second source register index.
    pub rs2: usize,
    /// `funct3`.
    pub funct3: u32,
    /// `funct7`.
    pub funct7: u32,
    /// Sign-extended immediate for the instruction's format; zero for R-type.
    pub imm: i64,
}

impl Decoded {
    /// Whether the instruction reads `rs1`.
    pub const fn reads_rs1(&self) -> bool {
        use crate::isa::opcodes::{base, system};
        match self.opcode {
            base::OP_LUI | base::OP_AUIPC | base::OP_JAL | base::OP_MISC_MEM => false,
            system::OP_SYSTEM => matches!(self.funct3, 0b001..=0b011),
            _ => true,
        }
    }

    /// Whether the instruction reads `rs2`.
    pub const fn reads_rs2(&self) -> bool {
        use crate::isa::opcodes::{atomic, base};
        matches!(
            self.opcode,
            base::OP_STORE | base::OP_BRANCH | base::OP_REG | base::OP_REG_32 | atomic::OP_AMO
        )
    }
}
