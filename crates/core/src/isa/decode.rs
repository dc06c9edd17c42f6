//! RISC-V Instruction Decoder.
//!
//! Splits a 32-bit encoding into a [`Decoded`] record. Immediates are rebuilt
//! from their scattered fields and sign-extended according to the format the
//! major opcode implies.

use crate::isa::instruction::{Decoded, InstructionBits};
use crate::isa::opcodes::{base, system};

/// Decodes `inst` into its fields.
///
/// # Arguments
///
/// * `inst` - The 32-bit instruction encoding.
///
/// # Returns
///
/// The decoded fields. Opcodes without an immediate yield `imm == 0`.
pub fn decode(inst: u32) -> Decoded {
    let opcode = inst.opcode();
    let imm = match opcode {
        base::OP_IMM | base::OP_IMM_32 | base::OP_LOAD | base::OP_JALR | system::OP_SYSTEM => {
            i_imm(inst)
        }
        base::OP_STORE => s_imm(inst),
        base::OP_BRANCH => b_imm(inst),
        base::OP_LUI | base::OP_AUIPC => u_imm(inst),
        base::OP_JAL => j_imm(inst),
        _ => 0,
    };

    Decoded {
        raw: inst,
        opcode,
        rd: inst.rd(),
        rs1: inst.rs1(),
        rs2: inst.rs2(),
        funct3: inst.funct3(),
        funct7: inst.funct7(),
        imm,
    }
}

/// `imm[11:0]` in bits 31:20.
fn i_imm(inst: u32) -> i64 {
    i64::from((inst as i32) >> 20)
}

/// `imm[11:5]` in bits 31:25, `imm[4:0]` in bits 11:7.
fn s_imm(inst: u32) -> i64 {
    let value = ((inst >> 25) << 5) | ((inst >> 7) & 0x1F);
    sign_extend(value, 12)
}

/// `imm[12|10:5]` in bits 31:25, `imm[4:1|11]` in bits 11:7.
fn b_imm(inst: u32) -> i64 {
    let value = (((inst >> 31) & 1) << 12)
        | (((inst >> 7) & 1) << 11)
        | (((inst >> 25) & 0x3F) << 5)
        | (((inst >> 8) & 0xF) << 1);
    sign_extend(value, 13)
}

/// `imm[31:12]` in bits 31:12.
fn u_imm(inst: u32) -> i64 {
    i64::from((inst & 0xFFFF_F000) as i32)
}

/// `imm[20|10:1|11|19:12]` in bits 31:12.
fn j_imm(inst: u32) -> i64 {
    let value = (((inst >> 31) & 1) << 20)
        | (((inst >> 12) & 0xFF) << 12)
        | (((inst >> 20) & 1) << 11)
        | (((inst >> 21) & 0x3FF) << 1);
    sign_extend(value, 21)
}

/// Sign-extends the low `bits` bits of `value`.
fn sign_extend(value: u32, bits: u32) -> i64 {
    let shift = 32 - bits;
    i64::from(((value << shift) as i32) >> shift)
}
