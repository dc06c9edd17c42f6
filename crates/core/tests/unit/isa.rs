//! # Instruction Decoding Tests

use pretty_assertions::assert_eq;
use rstest::rstest;
use rvcosim_core::isa::cause::{Trap, exception};
use rvcosim_core::isa::decode::decode;
use rvcosim_core::isa::instruction::InstructionBits;
use rvcosim_core::isa::opcodes::{atomic, base, system};

use crate::common::builder::InstructionBuilder;

#[test]
fn test_decode_r_type() {
    let inst = InstructionBuilder::new().sub(3, 1, 2).build();
    let d = decode(inst);
    assert_eq!(d.opcode, base::OP_REG);
    assert_eq!((d.rd, d.rs1, d.rs2), (3, 1, 2));
    assert_eq!(d.funct7, base::funct7::ALT);
    assert_eq!(d.imm, 0);
    assert!(d.reads_rs1() && d.reads_rs2());
}

#[rstest]
#[case(InstructionBuilder::new().addi(1, 2, -1), -1)]
#[case(InstructionBuilder::new().addi(1, 2, 2047), 2047)]
#[case(InstructionBuilder::new().lw(1, 2, -2048), -2048)]
#[case(InstructionBuilder::new().sw(2, 3, -4), -4)]
#[case(InstructionBuilder::new().sw(2, 3, 0x7F0), 0x7F0)]
#[case(InstructionBuilder::new().beq(1, 2, -8), -8)]
#[case(InstructionBuilder::new().beq(1, 2, 4094), 4094)]
#[case(InstructionBuilder::new().jal(1, -4096), -4096)]
#[case(InstructionBuilder::new().jal(1, 0x000F_FFFE), 0x000F_FFFE)]
fn test_decode_immediates(#[case] builder: InstructionBuilder, #[case] imm: i64) {
    assert_eq!(decode(builder.build()).imm, imm);
}

#[test]
fn test_decode_u_type_immediate_is_shifted() {
    let d = decode(InstructionBuilder::new().lui(5, 0x80000).build());
    assert_eq!(d.imm, -0x8000_0000);
    assert!(!d.reads_rs1());

    let d = decode(InstructionBuilder::new().auipc(5, 1).build());
    assert_eq!(d.imm, 0x1000);
}

#[test]
fn test_field_accessors() {
    let inst = InstructionBuilder::new().sc_w(10, 11, 12).build();
    assert_eq!(inst.opcode(), atomic::OP_AMO);
    assert_eq!(inst.funct5(), atomic::funct5::SC);
    assert_eq!(inst.funct3(), atomic::WIDTH_32);
    assert_eq!((inst.rd(), inst.rs1(), inst.rs2()), (10, 11, 12));

    let csr = InstructionBuilder::new().csrrw(1, 0x305, 2).build();
    assert_eq!(csr.csr(), 0x305);
    assert_eq!(csr.funct3(), system::CSRRW);
}

#[test]
fn test_known_encodings() {
    assert_eq!(InstructionBuilder::new().addi(0, 0, 0).build(), 0x0000_0013);
    assert_eq!(decode(system::ECALL).opcode, system::OP_SYSTEM);
    // `csrrs x0, mstatus, x0` reads without writing.
    let d = decode(InstructionBuilder::new().csrrs(0, 0x300, 0).build());
    assert!(d.reads_rs1());
}

#[test]
fn test_trap_causes_and_values() {
    assert_eq!(
        Trap::IllegalInstruction(0xdead).cause(),
        exception::ILLEGAL_INSTRUCTION
    );
    assert_eq!(Trap::IllegalInstruction(0xdead).tval(true), 0xdead);
    assert_eq!(Trap::IllegalInstruction(0xdead).tval(false), 0);
    assert_eq!(Trap::LoadAccessFault(0x10).tval(false), 0x10);
    assert_eq!(
        Trap::EnvironmentCallFromMMode.cause(),
        exception::ENVIRONMENT_CALL_FROM_M_MODE
    );
}
