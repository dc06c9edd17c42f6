//! Instruction execution for the reference interpreter.
//!
//! Register values are stored zero-extended to 64 bits and masked to the active
//! register width after every write, so RV32 arithmetic is performed in 64-bit
//! registers and truncated. Signed views go through [`ReferenceEngine::sext`].

use tracing::trace;

use super::atomic::amo_alu;
use super::csr::{Csrs, MSTATUS_MIE, MSTATUS_MPIE, MSTATUS_MPP};
use super::{ReferenceEngine, reg_name};
use crate::config::Xlen;
use crate::engine::StepEnv;
use crate::isa::cause::Trap;
use crate::isa::instruction::{Decoded, InstructionBits};
use crate::isa::opcodes::{atomic, base, muldiv, system};
use crate::platform::{AtomicSupport, Reservability};
use crate::rvfi::trace::MemAccess;

/// Kind of data access, for permission and alignment checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Load,
    Store,
    Atomic,
}

impl ReferenceEngine {
    /// Executes one decoded instruction and returns the next PC.
    pub(super) fn execute(&mut self, d: &Decoded, env: &mut StepEnv<'_>) -> Result<u64, Trap> {
        let pc = self.pc;
        let next = pc.wrapping_add(4);
        let illegal = Trap::IllegalInstruction(d.raw);
        let rv64 = self.xlen == Xlen::Rv64;

        match d.opcode {
            base::OP_LUI => {
                self.write_rd(d.rd, d.imm as u64);
                Ok(next)
            }
            base::OP_AUIPC => {
                self.write_rd(d.rd, pc.wrapping_add(d.imm as u64));
                Ok(next)
            }
            base::OP_JAL => {
                let target = self.jump_target(pc.wrapping_add(d.imm as u64))?;
                self.write_rd(d.rd, next);
                Ok(target)
            }
            base::OP_JALR if d.funct3 == 0 => {
                let base = self.rs1(d);
                let target = self.jump_target(base.wrapping_add(d.imm as u64) & !1)?;
                self.write_rd(d.rd, next);
                Ok(target)
            }
            base::OP_BRANCH => {
                let (a, b) = (self.rs1(d), self.rs2(d));
                let taken = match d.funct3 {
                    base::funct3::BEQ => a == b,
                    base::funct3::BNE => a != b,
                    base::funct3::BLT => self.sext(a) < self.sext(b),
                    base::funct3::BGE => self.sext(a) >= self.sext(b),
                    base::funct3::BLTU => a < b,
                    base::funct3::BGEU => a >= b,
                    _ => return Err(illegal),
                };
                if taken {
                    self.jump_target(pc.wrapping_add(d.imm as u64))
                } else {
                    Ok(next)
                }
            }
            base::OP_LOAD => {
                let (len, signed) = match d.funct3 {
                    base::funct3::BYTE => (1, true),
                    base::funct3::HALF => (2, true),
                    base::funct3::WORD => (4, true),
                    base::funct3::DOUBLE if rv64 => (8, false),
                    base::funct3::BYTE_U => (1, false),
                    base::funct3::HALF_U => (2, false),
                    base::funct3::WORD_U if rv64 => (4, false),
                    _ => return Err(illegal),
                };
                let base = self.rs1(d);
                let addr = self.mask(base.wrapping_add(d.imm as u64));
                let raw = self.load(env, addr, len, Access::Load)?;
                let value = if signed { sign_extend(raw, len) } else { raw };
                self.write_rd(d.rd, value);
                Ok(next)
            }
            base::OP_STORE => {
                let len = match d.funct3 {
                    base::funct3::BYTE => 1,
                    base::funct3::HALF => 2,
                    base::funct3::WORD => 4,
                    base::funct3::DOUBLE if rv64 => 8,
                    _ => return Err(illegal),
                };
                let base = self.rs1(d);
                let addr = self.mask(base.wrapping_add(d.imm as u64));
                let value = self.rs2(d);
                self.store(env, addr, len, value, Access::Store)?;
                Ok(next)
            }
            base::OP_IMM => {
                let a = self.rs1(d);
                let value = self.alu_imm(d, a).ok_or(illegal)?;
                self.write_rd(d.rd, value);
                Ok(next)
            }
            base::OP_IMM_32 if rv64 => {
                let a = self.rs1(d);
                let value = alu_imm_word(d, a).ok_or(illegal)?;
                self.write_rd(d.rd, value);
                Ok(next)
            }
            base::OP_REG => {
                let (a, b) = (self.rs1(d), self.rs2(d));
                let value = match d.funct7 {
                    base::funct7::MULDIV => self.muldiv(d.funct3, a, b),
                    base::funct7::DEFAULT => self.alu(d.funct3, false, a, b),
                    base::funct7::ALT
                        if matches!(d.funct3, base::funct3::ADD_SUB | base::funct3::SRL_SRA) =>
                    {
                        self.alu(d.funct3, true, a, b)
                    }
                    _ => return Err(illegal),
                };
                self.write_rd(d.rd, value);
                Ok(next)
            }
            base::OP_REG_32 if rv64 => {
                let (a, b) = (self.rs1(d), self.rs2(d));
                let value = alu_reg_word(d, a, b).ok_or(illegal)?;
                self.write_rd(d.rd, value);
                Ok(next)
            }
            base::OP_MISC_MEM => match d.funct3 {
                base::funct3::FENCE | base::funct3::FENCE_I => Ok(next),
                _ => Err(illegal),
            },
            atomic::OP_AMO => {
                self.execute_atomic(d, env)?;
                Ok(next)
            }
            system::OP_SYSTEM => self.execute_system(d, next),
            _ => Err(illegal),
        }
    }

    /// LR, SC and AMOs.
    fn execute_atomic(&mut self, d: &Decoded, env: &mut StepEnv<'_>) -> Result<(), Trap> {
        let illegal = Trap::IllegalInstruction(d.raw);
        let len = match d.funct3 {
            atomic::WIDTH_32 => 4,
            atomic::WIDTH_64 if self.xlen == Xlen::Rv64 => 8,
            _ => return Err(illegal),
        };
        let word = len == 4;
        let addr = self.rs1(d);

        match d.raw.funct5() {
            atomic::funct5::LR => {
                if d.rs2 != 0 {
                    return Err(illegal);
                }
                if addr % len != 0 {
                    return Err(Trap::LoadAddressMisaligned(addr));
                }
                if env.platform.pma(addr).reservability == Reservability::None {
                    return Err(Trap::LoadAccessFault(addr));
                }
                let value = self.load(env, addr, len, Access::Load)?;
                env.reservation.load_reservation(addr);
                self.write_rd(d.rd, sign_extend(value, len));
            }
            atomic::funct5::SC => {
                if addr % len != 0 {
                    return Err(Trap::StoreAddressMisaligned(addr));
                }
                if env.platform.pma(addr).reservability == Reservability::None {
                    return Err(Trap::StoreAccessFault(addr));
                }
                let value = self.rs2(d);
                let success = env.reservation.speculate_conditional()
                    && env.reservation.match_reservation(addr);
                if success {
                    self.store(env, addr, len, value, Access::Atomic)?;
                }
                env.reservation.cancel_reservation();
                self.write_rd(d.rd, u64::from(!success));
            }
            op => {
                if addr % len != 0 {
                    return Err(Trap::StoreAddressMisaligned(addr));
                }
                if env.platform.pma(addr).atomic_support == AtomicSupport::None {
                    return Err(Trap::StoreAccessFault(addr));
                }
                let src = self.rs2(d);
                let old = self.load(env, addr, len, Access::Atomic)?;
                let new = amo_alu(op, old, src, word).ok_or(illegal)?;
                self.store(env, addr, len, new, Access::Atomic)?;
                self.write_rd(d.rd, sign_extend(old, len));
            }
        }
        Ok(())
    }

    /// ECALL, EBREAK, MRET, WFI and CSR accesses.
    fn execute_system(&mut self, d: &Decoded, next: u64) -> Result<u64, Trap> {
        let illegal = Trap::IllegalInstruction(d.raw);
        match d.funct3 {
            0 => match d.raw {
                system::ECALL => Err(Trap::EnvironmentCallFromMMode),
                system::EBREAK => Err(Trap::Breakpoint(self.pc)),
                system::MRET => {
                    let mpie = self.csrs.mstatus & MSTATUS_MPIE != 0;
                    self.csrs.mstatus =
                        MSTATUS_MPP | MSTATUS_MPIE | if mpie { MSTATUS_MIE } else { 0 };
                    Ok(self.csrs.mepc)
                }
                system::WFI => Ok(next),
                _ => Err(illegal),
            },
            system::CSRRW | system::CSRRS | system::CSRRC => {
                let src = self.rs1(d);
                self.csr_op(d, src)?;
                Ok(next)
            }
            system::CSRRWI | system::CSRRSI | system::CSRRCI => {
                self.csr_op(d, d.rs1 as u64)?;
                Ok(next)
            }
            _ => Err(illegal),
        }
    }

    fn csr_op(&mut self, d: &Decoded, src: u64) -> Result<(), Trap> {
        let illegal = Trap::IllegalInstruction(d.raw);
        let addr = d.raw.csr();
        let old = self.csrs.read(addr).ok_or(illegal)?;
        let op = d.funct3 & 0b11;
        let writes = op == system::CSRRW || d.rs1 != 0;
        if writes {
            if Csrs::is_read_only(addr) {
                return Err(illegal);
            }
            let new = match op {
                system::CSRRW => src,
                system::CSRRS => old | src,
                _ => old & !src,
            };
            self.csrs.write(addr, new).ok_or(illegal)?;
            trace!(target: "reg", "CSR {addr:#05x} <- {new:#x} (input: {src:#x})");
        }
        self.write_rd(d.rd, old);
        Ok(())
    }

    /// Register-register ALU for the base and alternate encodings.
    fn alu(&self, funct3: u32, alt: bool, a: u64, b: u64) -> u64 {
        let shamt = (b & u64::from(self.xlen.bits() - 1)) as u32;
        let value = match funct3 {
            base::funct3::ADD_SUB if alt => a.wrapping_sub(b),
            base::funct3::ADD_SUB => a.wrapping_add(b),
            base::funct3::SLL => a << shamt,
            base::funct3::SLT => u64::from(self.sext(a) < self.sext(b)),
            base::funct3::SLTU => u64::from(a < b),
            base::funct3::XOR => a ^ b,
            base::funct3::SRL_SRA if alt => (self.sext(a) >> shamt) as u64,
            base::funct3::SRL_SRA => a >> shamt,
            base::funct3::OR => a | b,
            _ => a & b,
        };
        self.mask(value)
    }

    /// Register-immediate ALU, validating shift encodings.
    fn alu_imm(&self, d: &Decoded, a: u64) -> Option<u64> {
        let shamt_bits = self.xlen.bits().trailing_zeros();
        let upper = d.raw >> (20 + shamt_bits);
        let imm = d.imm as u64;
        match d.funct3 {
            base::funct3::SLL if upper != 0 => None,
            base::funct3::SRL_SRA if upper & !(1 << (10 - shamt_bits)) != 0 => None,
            base::funct3::SLL => Some(self.alu(d.funct3, false, a, imm)),
            base::funct3::SRL_SRA => {
                let alt = (d.raw >> 30) & 1 != 0;
                Some(self.alu(d.funct3, alt, a, imm))
            }
            _ => Some(self.alu(d.funct3, false, a, imm)),
        }
    }

    /// M-extension operations at full register width.
    fn muldiv(&self, funct3: u32, a: u64, b: u64) -> u64 {
        let bits = self.xlen.bits();
        let (sa, sb) = (i128::from(self.sext(a)), i128::from(self.sext(b)));
        let (ua, ub) = (u128::from(a), u128::from(b));
        let value = match funct3 {
            muldiv::MUL => a.wrapping_mul(b),
            muldiv::MULH => ((sa * sb) >> bits) as u64,
            muldiv::MULHSU => ((sa * ub as i128) >> bits) as u64,
            muldiv::MULHU => ((ua * ub) >> bits) as u64,
            muldiv::DIV => match self.sext(b) {
                0 => u64::MAX,
                divisor => self.sext(a).wrapping_div(divisor) as u64,
            },
            muldiv::DIVU => a.checked_div(b).unwrap_or(u64::MAX),
            muldiv::REM => match self.sext(b) {
                0 => a,
                divisor => self.sext(a).wrapping_rem(divisor) as u64,
            },
            _ => a.checked_rem(b).unwrap_or(a),
        };
        self.mask(value)
    }

    /// Checks a control-transfer target.
    const fn jump_target(&self, target: u64) -> Result<u64, Trap> {
        let target = self.mask(target);
        if target & 0b11 == 0 {
            Ok(target)
        } else {
            Err(Trap::InstructionAddressMisaligned(target))
        }
    }

    /// Reads `rs1`, recording it in the trace.
    fn rs1(&mut self, d: &Decoded) -> u64 {
        let value = self.regs[d.rs1];
        self.scratch.int.rs1_addr = d.rs1 as u8;
        self.scratch.int.rs1_rdata = value;
        value
    }

    /// Reads `rs2`, recording it in the trace.
    fn rs2(&mut self, d: &Decoded) -> u64 {
        let value = self.regs[d.rs2];
        self.scratch.int.rs2_addr = d.rs2 as u8;
        self.scratch.int.rs2_rdata = value;
        value
    }

    /// Writes `rd`, recording it in the trace; `x0` stays zero.
    fn write_rd(&mut self, rd: usize, value: u64) {
        if rd == 0 {
            return;
        }
        let value = self.mask(value);
        self.regs[rd] = value;
        self.scratch.int.rd_addr = rd as u8;
        self.scratch.int.rd_wdata = value;
        self.scratch.rd_written = true;
        trace!(target: "reg", "x{rd} ({}) <- {value:#x}", reg_name(rd));
    }

    /// Performs a checked data read.
    fn load(
        &mut self,
        env: &StepEnv<'_>,
        addr: u64,
        len: u64,
        access: Access,
    ) -> Result<u64, Trap> {
        let platform = env.platform;
        let value = if platform.within_clint(addr, len) {
            self.clint.read(addr - platform.clint_base(), len)
        } else {
            check_access(env, addr, len, access)?;
            self.memory.read(addr, len)
        };
        let mem = self.scratch.mem.get_or_insert_with(MemAccess::default);
        mem.addr = addr;
        mem.rdata[0] = value;
        mem.rmask = MemAccess::mask_for(len as u32);
        trace!(target: "mem", "mem[R,{addr:#x}] -> {value:#x}");
        Ok(value)
    }

    /// Performs a checked data write.
    fn store(
        &mut self,
        env: &StepEnv<'_>,
        addr: u64,
        len: u64,
        value: u64,
        access: Access,
    ) -> Result<(), Trap> {
        let platform = env.platform;
        let value = if len >= 8 { value } else { value & ((1 << (len * 8)) - 1) };
        if platform.within_clint(addr, len) {
            self.clint.write(addr - platform.clint_base(), len, value);
        } else {
            check_access(env, addr, len, access)?;
            self.memory.write(addr, len, value);
            if self.htif.hit(addr, len) {
                self.scratch.tohost_written = true;
            }
        }
        let mem = self.scratch.mem.get_or_insert_with(MemAccess::default);
        mem.addr = addr;
        mem.wdata[0] = value;
        mem.wmask = MemAccess::mask_for(len as u32);
        trace!(target: "mem", "mem[W,{addr:#x}] <- {value:#x}");
        Ok(())
    }

    /// Signed view of a register value at the active width.
    pub(super) const fn sext(&self, value: u64) -> i64 {
        match self.xlen {
            Xlen::Rv32 => value as u32 as i32 as i64,
            Xlen::Rv64 => value as i64,
        }
    }

    const fn mask(&self, value: u64) -> u64 {
        value & self.xlen.mask()
    }
}

/// Alignment, bounds and PMA permission checks for a data access.
fn check_access(env: &StepEnv<'_>, addr: u64, len: u64, access: Access) -> Result<(), Trap> {
    let platform = env.platform;
    let misaligned = addr % len != 0;
    if misaligned && (access == Access::Atomic || !platform.enable_misaligned_access()) {
        return Err(match access {
            Access::Load => Trap::LoadAddressMisaligned(addr),
            Access::Store | Access::Atomic => Trap::StoreAddressMisaligned(addr),
        });
    }
    let pma = platform.pma(addr);
    let permitted = platform.within_phys_mem(addr, len)
        && match access {
            Access::Load => pma.readable,
            Access::Store => pma.writable,
            Access::Atomic => pma.readable && pma.writable,
        };
    if permitted {
        Ok(())
    } else {
        Err(match access {
            Access::Load => Trap::LoadAccessFault(addr),
            Access::Store | Access::Atomic => Trap::StoreAccessFault(addr),
        })
    }
}

/// Sign-extends the low `len` bytes of `value`.
const fn sign_extend(value: u64, len: u64) -> u64 {
    let shift = 64 - len * 8;
    (((value << shift) as i64) >> shift) as u64
}

/// RV64 `*IW` register-immediate operations.
fn alu_imm_word(d: &Decoded, a: u64) -> Option<u64> {
    let a32 = a as u32;
    let shamt = (d.imm as u32) & 0x1F;
    let shift_bits = d.raw >> 25;
    let value = match d.funct3 {
        base::funct3::ADD_SUB => a32.wrapping_add(d.imm as u32),
        base::funct3::SLL if shift_bits == 0 => a32 << shamt,
        base::funct3::SRL_SRA if shift_bits == 0 => a32 >> shamt,
        base::funct3::SRL_SRA if shift_bits == base::funct7::ALT => ((a32 as i32) >> shamt) as u32,
        _ => return None,
    };
    Some(word_result(value))
}

/// RV64 `*W` register-register operations, including M.
fn alu_reg_word(d: &Decoded, a: u64, b: u64) -> Option<u64> {
    let (a32, b32) = (a as u32, b as u32);
    let (sa, sb) = (a32 as i32, b32 as i32);
    let shamt = b32 & 0x1F;
    let value = match (d.funct7, d.funct3) {
        (base::funct7::DEFAULT, base::funct3::ADD_SUB) => a32.wrapping_add(b32),
        (base::funct7::ALT, base::funct3::ADD_SUB) => a32.wrapping_sub(b32),
        (base::funct7::DEFAULT, base::funct3::SLL) => a32 << shamt,
        (base::funct7::DEFAULT, base::funct3::SRL_SRA) => a32 >> shamt,
        (base::funct7::ALT, base::funct3::SRL_SRA) => (sa >> shamt) as u32,
        (base::funct7::MULDIV, muldiv::MUL) => a32.wrapping_mul(b32),
        (base::funct7::MULDIV, muldiv::DIV) => match sb {
            0 => u32::MAX,
            _ => sa.wrapping_div(sb) as u32,
        },
        (base::funct7::MULDIV, muldiv::DIVU) => a32.checked_div(b32).unwrap_or(u32::MAX),
        (base::funct7::MULDIV, muldiv::REM) => match sb {
            0 => a32,
            _ => sa.wrapping_rem(sb) as u32,
        },
        (base::funct7::MULDIV, muldiv::REMU) => a32.checked_rem(b32).unwrap_or(a32),
        _ => return None,
    };
    Some(word_result(value))
}

/// Sign-extends a 32-bit result to 64 bits.
const fn word_result(value: u32) -> u64 {
    value as i32 as i64 as u64
}
