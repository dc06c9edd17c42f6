//! Opcodes and function codes.
//!
//! Grouped by extension. Only what the reference engine executes is listed.

/// Base integer instruction set (RV32I/RV64I).
pub mod base {
    /// Loads.
    pub const OP_LOAD: u32 = 0b000_0011;
    /// FENCE / FENCE.I.
    pub const OP_MISC_MEM: u32 = 0b000_1111;
    /// Register-immediate arithmetic.
    pub const OP_IMM: u32 = 0b001_0011;
    /// AUIPC.
    pub const OP_AUIPC: u32 = 0b001_0111;
    /// 32-bit register-immediate arithmetic (RV64 only).
    pub const OP_IMM_32: u32 = 0b001_1011;
    /// Stores.
    pub const OP_STORE: u32 = 0b010_0011;
    /// Register-register arithmetic, including M.
    pub const OP_REG: u32 = 0b011_0011;
    /// LUI.
    pub const OP_LUI: u32 = 0b011_0111;
    /// 32-bit register-register arithmetic (RV64 only).
    pub const OP_REG_32: u32 = 0b011_1011;
    /// Conditional branches.
    pub const OP_BRANCH: u32 = 0b110_0011;
    /// JALR.
    pub const OP_JALR: u32 = 0b110_0111;
    /// JAL.
    pub const OP_JAL: u32 = 0b110_1111;

    /// `funct3` values of the base set.
    pub mod funct3 {
        /// LB / SB.
        pub const BYTE: u32 = 0b000;
        /// LH / SH.
        pub const HALF: u32 = 0b001;
        /// LW / SW.
        pub const WORD: u32 = 0b010;
        /// LD / SD.
        pub const DOUBLE: u32 = 0b011;
        /// LBU.
        pub const BYTE_U: u32 = 0b100;
        /// LHU.
        pub const HALF_U: u32 = 0b101;
        /// LWU.
        pub const WORD_U: u32 = 0b110;

        /// BEQ.
        pub const BEQ: u32 = 0b000;
        /// BNE.
        pub const BNE: u32 = 0b001;
        /// BLT.
        pub const BLT: u32 = 0b100;
        /// BGE.
        pub const BGE: u32 = 0b101;
        /// BLTU.
        pub const BLTU: u32 = 0b110;
        /// BGEU.
        pub const BGEU: u32 = 0b111;

        /// ADD / SUB.
        pub const ADD_SUB: u32 = 0b000;
        /// SLL.
        pub const SLL: u32 = 0b001;
        /// SLT.
        pub const SLT: u32 = 0b010;
        /// SLTU.
        pub const SLTU: u32 = 0b011;
        /// XOR.
        pub const XOR: u32 = 0b100;
        /// SRL / SRA.
        pub const SRL_SRA: u32 = 0b101;
        /// OR.
        pub const OR: u32 = 0b110;
        /// AND.
        pub const AND: u32 = 0b111;

        /// FENCE.
        pub const FENCE: u32 = 0b000;
        /// FENCE.I.
        pub const FENCE_I: u32 = 0b001;
    }

    /// `funct7` values of the base set.
    pub mod funct7 {
        /// Default operation.
        pub const DEFAULT: u32 = 0b000_0000;
        /// SUB / SRA.
        pub const ALT: u32 = 0b010_0000;
        /// M extension.
        pub const MULDIV: u32 = 0b000_0001;
    }
}

/// Integer multiply/divide (M) `funct3` values under `funct7 == MULDIV`.
pub mod muldiv {
    /// MUL / MULW.
    pub const MUL: u32 = 0b000;
    /// MULH.
    pub const MULH: u32 = 0b001;
    /// MULHSU.
    pub const MULHSU: u32 = 0b010;
    /// MULHU.
    pub const MULHU: u32 = 0b011;
    /// DIV / DIVW.
    pub const DIV: u32 = 0b100;
    /// DIVU / DIVUW.
    pub const DIVU: u32 = 0b101;
    /// REM / REMW.
    pub const REM: u32 = 0b110;
    /// REMU / REMUW.
    pub const REMU: u32 = 0b111;
}

/// Atomic (A) extension.
pub mod atomic {
    /// All LR, SC and AMO instructions.
    pub const OP_AMO: u32 = 0b010_1111;

    /// 32-bit operand width.
    pub const WIDTH_32: u32 = 0b010;
    /// 64-bit operand width.
    pub const WIDTH_64: u32 = 0b011;

    /// `funct5` operation selectors.
    pub mod funct5 {
        /// AMOADD.
        pub const AMOADD: u32 = 0b00000;
        /// AMOSWAP.
        pub const AMOSWAP: u32 = 0b00001;
        /// LR.
        pub const LR: u32 = 0b00010;
        /// SC.
        pub const SC: u32 = 0b00011;
        /// AMOXOR.
        pub const AMOXOR: u32 = 0b00100;
        /// AMOOR.
        pub const AMOOR: u32 = 0b01000;
        /// AMOAND.
        pub const AMOAND: u32 = 0b01100;
        /// AMOMIN.
        pub const AMOMIN: u32 = 0b10000;
        /// AMOMAX.
        pub const AMOMAX: u32 = 0b10100;
        /// AMOMINU.
        pub const AMOMINU: u32 = 0b11000;
        /// AMOMAXU.
        pub const AMOMAXU: u32 = 0b11100;
    }
}

/// System instructions and Zicsr.
pub mod system {
    /// ECALL, EBREAK, xRET, WFI and CSR accesses.
    pub const OP_SYSTEM: u32 = 0b111_0011;

    /// ECALL.
    pub const ECALL: u32 = 0x0000_0073;
    /// EBREAK.
    pub const EBREAK: u32 = 0x0010_0073;
    /// MRET.
    pub const MRET: u32 = 0x3020_0073;
    /// WFI.
    pub const WFI: u32 = 0x1050_0073;

    /// CSRRW.
    pub const CSRRW: u32 = 0b001;
    /// CSRRS.
    pub const CSRRS: u32 = 0b010;
    /// CSRRC.
    pub const CSRRC: u32 = 0b011;
    /// CSRRWI.
    pub const CSRRWI: u32 = 0b101;
    /// CSRRSI.
    pub const CSRRSI: u32 = 0b110;
    /// CSRRCI.
    pub const CSRRCI: u32 = 0b111;
}
