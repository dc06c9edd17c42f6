//! Reference interpreter.
//!
//! A small instruction-semantics engine covering RV32I/RV64I with the M, A and
//! Zicsr extensions in machine mode. It exists so the harness runs and can be
//! tested without an external engine. It provides:
//! 1. **State:** Integer register file, PC, machine CSRs and sparse physical memory.
//! 2. **Devices:** The CLINT timer and the host-target mailbox.
//! 3. **Traps:** Precise synchronous exceptions and machine timer/software interrupts.
//! 4. **Tracing:** One RVFI trace record per step, including injected instructions.

/// AMO arithmetic.
pub mod atomic;
/// CLINT timer device.
pub mod clint;
/// Machine-mode CSRs.
pub mod csr;
/// Host-target mailbox decoding.
pub mod htif;
/// Sparse physical memory.
pub mod memory;

mod execute;

use std::fmt;
use std::io::{self, Write};

use tracing::{debug, trace, warn};

use self::clint::Clint;
use self::csr::{Csrs, MIP_MSIP, MIP_MTIP, MSTATUS_MIE, MSTATUS_MPIE, MSTATUS_MPP};
use self::htif::{Htif, HtifEvent};
use self::memory::SparseMemory;
use crate::config::{CsrConfig, Xlen};
use crate::engine::{Engine, RvfiEngine, StepEnv, StepOutcome};
use crate::isa::abi;
use crate::isa::cause::{self, Trap};
use crate::isa::decode::decode;
use crate::platform::Platform;
use crate::rvfi::trace::{IntData, MemAccess, RvfiTrace};

/// Privilege mode reported in traces; only machine mode is implemented.
const MACHINE_MODE: u8 = 3;

/// Register effects gathered while one instruction executes.
#[derive(Debug, Clone, Copy, Default)]
struct StepScratch {
    int: IntData,
    rd_written: bool,
    mem: Option<MemAccess>,
    tohost_written: bool,
}

/// The reference interpreter.
pub struct ReferenceEngine {
    xlen: Xlen,
    regs: [u64; 32],
    pc: u64,
    csrs: Csrs,
    memory: SparseMemory,
    clint: Clint,
    htif: Htif,
    terminal: Box<dyn Write>,
    terminal_error: Option<io::Error>,
    injected: Option<u32>,
    trace: RvfiTrace,
    scratch: StepScratch,
    order: u64,
    entered_handler: bool,
    initialised: bool,
}

impl fmt::Debug for ReferenceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceEngine")
            .field("xlen", &self.xlen)
            .field("pc", &format_args!("{:#x}", self.pc))
            .field("order", &self.order)
            .field("resident_pages", &self.memory.resident_pages())
            .finish_non_exhaustive()
    }
}

impl Default for ReferenceEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceEngine {
    /// Creates an engine whose terminal output goes to standard output.
    pub fn new() -> Self {
        Self::with_terminal(Box::new(io::stdout()))
    }

    /// Creates an engine writing terminal output to `terminal`.
    pub fn with_terminal(terminal: Box<dyn Write>) -> Self {
        Self {
            xlen: Xlen::default(),
            regs: [0; 32],
            pc: 0,
            csrs: Csrs::new(Xlen::default(), &CsrConfig::default()),
            memory: SparseMemory::new(),
            clint: Clint::default(),
            htif: Htif::default(),
            terminal,
            terminal_error: None,
            injected: None,
            trace: RvfiTrace::default(),
            scratch: StepScratch::default(),
            order: 0,
            entered_handler: false,
            initialised: false,
        }
    }

    /// Takes the error left by the last failed terminal flush on shutdown.
    pub fn take_terminal_error(&mut self) -> Option<io::Error> {
        self.terminal_error.take()
    }

    /// Value of integer register `index`.
    pub fn reg(&self, index: usize) -> u64 {
        self.regs.get(index).copied().unwrap_or(0)
    }

    /// Sets integer register `index`; writes to `x0` are ignored.
    pub fn set_reg(&mut self, index: usize, value: u64) {
        let mask = self.xlen.mask();
        if let Some(reg) = self.regs.get_mut(index).filter(|_| index != 0) {
            *reg = value & mask;
        }
    }

    /// Machine CSR state.
    pub const fn csrs(&self) -> &Csrs {
        &self.csrs
    }

    /// Physical memory.
    pub const fn memory(&self) -> &SparseMemory {
        &self.memory
    }

    /// CLINT state.
    pub const fn clint(&self) -> &Clint {
        &self.clint
    }

    /// Takes a pending machine interrupt if one is enabled.
    fn check_interrupts(&mut self) {
        if self.csrs.mstatus & MSTATUS_MIE == 0 {
            return;
        }
        let pending = self.csrs.mip & self.csrs.mie;
        let code = if pending & MIP_MSIP != 0 {
            3
        } else if pending & MIP_MTIP != 0 {
            cause::MACHINE_TIMER_INTERRUPT
        } else {
            return;
        };
        let interrupt_bit = 1 << (self.xlen.bits() - 1);
        debug!(target: "platform", "interrupt {code} taken at {:#x}", self.pc);
        self.enter_handler(interrupt_bit | code, 0);
    }

    /// Raises `trap` for the instruction at the current PC.
    fn take_trap(&mut self, trap: Trap, illegal_inst_bits: bool) {
        debug!(target: "instr", "trap {trap:?} at {:#x}", self.pc);
        self.enter_handler(trap.cause(), trap.tval(illegal_inst_bits));
    }

    fn enter_handler(&mut self, mcause: u64, mtval: u64) {
        let mask = self.xlen.mask();
        self.csrs.mepc = self.pc;
        self.csrs.mcause = mcause & mask;
        self.csrs.mtval = mtval & mask;
        let mie = self.csrs.mstatus & MSTATUS_MIE != 0;
        self.csrs.mstatus = MSTATUS_MPP | if mie { MSTATUS_MPIE } else { 0 };
        self.pc = self.csrs.mtvec & mask;
        self.entered_handler = true;
    }

    /// Fetches the instruction at the PC, or the injected one.
    fn fetch(&mut self, env: &StepEnv<'_>) -> Result<u32, Trap> {
        if let Some(insn) = self.injected.take() {
            return Ok(insn);
        }
        let pc = self.pc;
        if pc & 0b11 != 0 {
            return Err(Trap::InstructionAddressMisaligned(pc));
        }
        if !env.platform.within_phys_mem(pc, 4) || !env.platform.pma(pc).executable {
            return Err(Trap::InstructionAccessFault(pc));
        }
        Ok(self.memory.read(pc, 4) as u32)
    }

    /// Handles a store that touched the mailbox.
    fn service_htif(&mut self) -> io::Result<Option<u64>> {
        let Some(tohost) = self.htif.tohost() else {
            return Ok(None);
        };
        match Htif::decode(self.memory.read(tohost, 8)) {
            HtifEvent::Exit(code) => {
                debug!(target: "platform", "htif: exit {code}");
                Ok(Some(code))
            }
            HtifEvent::Putchar(byte) => {
                self.terminal.write_all(&[byte])?;
                self.terminal.flush()?;
                self.memory.write(tohost, 8, 0);
                Ok(None)
            }
            HtifEvent::Idle => Ok(None),
        }
    }
}

impl Engine for ReferenceEngine {
    fn init(&mut self, platform: &Platform) {
        self.xlen = platform.xlen();
        self.regs = [0; 32];
        self.pc = 0;
        self.csrs = Csrs::new(platform.xlen(), &platform.config().csr);
        self.memory.clear();
        self.clint = Clint::default();
        self.htif = Htif::new(platform.htif_tohost());
        self.injected = None;
        self.trace = RvfiTrace::default();
        self.scratch = StepScratch::default();
        self.order = 0;
        self.entered_handler = false;
        self.initialised = true;
        debug!(target: "platform", "reference engine initialised for RV{}", self.xlen.bits());
    }

    fn fini(&mut self) {
        self.initialised = false;
        if let Err(err) = self.terminal.flush() {
            warn!(target: "platform", "terminal flush failed: {err}");
            self.terminal_error = Some(err);
        }
    }

    fn step(&mut self, step_index: u64, env: &mut StepEnv<'_>) -> StepOutcome {
        if !self.initialised {
            return StepOutcome::fault("step before init");
        }

        let intr = std::mem::take(&mut self.entered_handler);
        if self.injected.is_none() {
            self.check_interrupts();
        }
        let intr = intr || std::mem::take(&mut self.entered_handler);

        self.scratch = StepScratch::default();
        let pc = self.pc;
        let illegal_inst_bits = env.platform.mtval_has_illegal_inst_bits();

        let (insn, result) = match self.fetch(env) {
            Ok(insn) => {
                trace!(target: "instr", "[{step_index}] [M]: {pc:#018x} ({insn:#010x})");
                (insn, self.execute(&decode(insn), env))
            }
            Err(trap) => (0, Err(trap)),
        };

        let trapped = match result {
            Ok(next_pc) => {
                self.pc = next_pc & self.xlen.mask();
                self.csrs.minstret = self.csrs.minstret.wrapping_add(1);
                false
            }
            Err(trap) => {
                self.take_trap(trap, illegal_inst_bits);
                true
            }
        };

        let scratch = self.scratch;
        self.trace = RvfiTrace {
            order: self.order,
            insn: u64::from(insn),
            trap: u8::from(trapped),
            halt: 0,
            intr: u8::from(intr),
            mode: MACHINE_MODE,
            ixl: self.xlen.mxl(),
            valid: 1,
            pc_rdata: pc,
            pc_wdata: self.pc,
            int_data: (scratch.rd_written && !trapped).then_some(scratch.int),
            mem_access: if trapped { None } else { scratch.mem },
        };
        self.order += 1;

        if scratch.tohost_written && !trapped {
            match self.service_htif() {
                Ok(Some(code)) => return StepOutcome::halted(code),
                Ok(None) => {}
                Err(err) => return StepOutcome::fault(format!("terminal write failed: {err}")),
            }
        }
        StepOutcome::retired()
    }

    fn tick_clock(&mut self) {
        self.csrs.mcycle = self.csrs.mcycle.wrapping_add(1);
        self.clint.tick();
    }

    fn tick_platform(&mut self) {
        let mut mip = self.csrs.mip & !(MIP_MTIP | MIP_MSIP);
        if self.clint.timer_pending() {
            mip |= MIP_MTIP;
        }
        if self.clint.software_pending() {
            mip |= MIP_MSIP;
        }
        if mip != self.csrs.mip {
            trace!(target: "platform", "mip <- {mip:#x} (mtime {})", self.clint.mtime());
        }
        self.csrs.mip = mip;
    }

    fn read_mem(&self, addr: u64) -> u8 {
        self.memory.read_u8(addr)
    }

    fn write_mem(&mut self, addr: u64, value: u8) {
        self.memory.write_u8(addr, value);
    }

    fn set_pc(&mut self, pc: u64) {
        self.pc = pc;
    }

    fn pc(&self) -> u64 {
        self.pc
    }
}

impl RvfiEngine for ReferenceEngine {
    fn inject_instruction(&mut self, insn: u32) {
        self.injected = Some(insn);
    }

    fn clear_trace(&mut self) {
        self.trace = RvfiTrace::default();
    }

    fn halt_trace(&mut self) {
        self.trace.halt = 1;
    }

    fn trace(&self) -> &RvfiTrace {
        &self.trace
    }
}

/// ABI name of a register, for trace output.
fn reg_name(index: usize) -> &'static str {
    abi::name(index)
}
