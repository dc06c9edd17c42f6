//! Simulation driver and program loading.
//!
//! Provides the pieces that sit around an engine:
//! 1. **Loader:** Reads ELF images and the symbols the harness needs.
//! 2. **Bootstrap:** Builds the reset-vector ROM and the initial memory image.
//! 3. **Simulator:** The stepping loop with halt, fault and limit handling.
//! 4. **Signature:** Dumps the test-signature region after a run.

/// Initial memory image and reset vector.
pub mod bootstrap;
/// ELF loading and symbol lookup.
pub mod loader;
/// Test-signature output.
pub mod signature;
/// The execution loop.
pub mod simulator;

pub use self::simulator::{LoopState, RunOutcome, Simulator, StepStatus};
