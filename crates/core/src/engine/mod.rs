//! Instruction-semantics engine interface.
//!
//! The execution loop never decodes instructions itself. It drives an [`Engine`]
//! through a narrow set of capabilities:
//! 1. **Lifecycle:** `init` against a frozen [`Platform`], `fini` before teardown.
//! 2. **Stepping:** `step` executes one instruction and reports a [`StepOutcome`].
//! 3. **Time:** `tick_clock` and `tick_platform`, delivered by the tick scheduler.
//! 4. **Bootstrap:** Byte-wide memory access and PC control used only while the
//!    initial memory image is installed.
//!
//! Engines that can be driven over the co-simulation wire protocol also implement
//! [`RvfiEngine`], which adds instruction injection and trace capture.

/// The bundled reference interpreter.
pub mod reference;

use crate::platform::Platform;
use crate::reservation::ReservationUnit;
use crate::rvfi::trace::RvfiTrace;

/// Result of one engine step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// An instruction retired, including one that trapped.
    pub stepped: bool,
    /// The guest signalled completion.
    pub halted: bool,
    /// Guest exit code; meaningful only when `halted` is set.
    pub exit_code: u64,
    /// Internal engine inconsistency, distinct from a guest trap.
    pub exception: Option<String>,
}

impl StepOutcome {
    /// One instruction retired and execution continues.
    pub const fn retired() -> Self {
        Self {
            stepped: true,
            halted: false,
            exit_code: 0,
            exception: None,
        }
    }

    /// One instruction retired and the guest halted with `exit_code`.
    pub const fn halted(exit_code: u64) -> Self {
        Self {
            stepped: true,
            halted: true,
            exit_code,
            exception: None,
        }
    }

    /// The engine hit an internal inconsistency.
    pub fn fault(reason: impl Into<String>) -> Self {
        Self {
            stepped: false,
            halted: false,
            exit_code: 0,
            exception: Some(reason.into()),
        }
    }
}

/// Harness state an engine may consult or update during one step.
///
/// The platform is read-only; the reservation unit is lent exclusively for the
/// duration of the step.
#[derive(Debug)]
pub struct StepEnv<'a> {
    /// Frozen platform configuration.
    pub platform: &'a Platform,
    /// LR/SC reservation tracking.
    pub reservation: &'a mut ReservationUnit,
}

/// Capabilities the execution loop needs from an instruction-semantics engine.
pub trait Engine {
    /// Resets architectural state for `platform`.
    fn init(&mut self, platform: &Platform);

    /// Releases state before teardown or reinitialization.
    fn fini(&mut self);

    /// Executes one instruction.
    ///
    /// # Arguments
    ///
    /// * `step_index` - Index of this step within the session.
    /// * `env` - Platform queries and the reservation unit.
    fn step(&mut self, step_index: u64, env: &mut StepEnv<'_>) -> StepOutcome;

    /// Advances the engine's notion of time by one tick.
    fn tick_clock(&mut self);

    /// Updates platform devices after a clock tick.
    fn tick_platform(&mut self);

    /// Reads one byte of physical memory, bypassing permission checks.
    fn read_mem(&self, addr: u64) -> u8;

    /// Writes one byte of physical memory, bypassing permission checks.
    fn write_mem(&mut self, addr: u64, value: u8);

    /// Sets the program counter.
    fn set_pc(&mut self, pc: u64);

    /// Current program counter.
    fn pc(&self) -> u64;
}

/// Engine capabilities required by the co-simulation protocol.
pub trait RvfiEngine: Engine {
    /// Supplies the encoding to execute on the next step instead of fetching.
    fn inject_instruction(&mut self, insn: u32);

    /// Zeroes the captured trace.
    fn clear_trace(&mut self);

    /// Marks the captured trace as halted.
    fn halt_trace(&mut self);

    /// Trace captured by the most recent step.
    fn trace(&self) -> &RvfiTrace;
}
