//! RISC-V instruction-stepping harness and RVFI-DII co-simulation library.
//!
//! This crate drives an instruction-set simulator one instruction at a time. It provides:
//! 1. **Platform:** Immutable machine configuration, memory map and physical memory attributes.
//! 2. **Reservation:** The load-reserved/store-conditional reservation unit.
//! 3. **Execution:** The stepping loop, tick scheduling, halt and fault detection.
//! 4. **Engine:** The capability interface the instruction-semantics engine implements,
//!    plus a reference interpreter that implements it.
//! 5. **Co-simulation:** The RVFI-DII wire protocol (commands, packet framing, version
//!    negotiation) that lets an external reference model step the simulator remotely.

/// Common types and constants (errors, protocol constants, memory map constants).
pub mod common;
/// Platform configuration (defaults, validation, hierarchical config structures).
pub mod config;
/// Instruction-semantics engine interface and the reference interpreter.
pub mod engine;
/// Instruction encoding helpers (decode, opcodes, trap causes, ABI names).
pub mod isa;
/// Platform model: read-only configuration queries and PMA lookup.
pub mod platform;
/// Load-reserved/store-conditional reservation tracking.
pub mod reservation;
/// RVFI-DII co-simulation protocol engine.
pub mod rvfi;
/// Execution loop, bootstrap, loader and signature output.
pub mod sim;
/// Retired-instruction counters and run timing.
pub mod stats;
/// Retired-instruction driven clock and platform ticks.
pub mod tick;

/// Root configuration type; use `PlatformConfig::default()` or deserialize from JSON.
pub use crate::config::PlatformConfig;
/// Engine capability traits; implement these to plug in an instruction-semantics engine.
pub use crate::engine::{Engine, RvfiEngine};
/// Frozen platform built from a validated configuration.
pub use crate::platform::Platform;
/// The stepping loop that drives an engine.
pub use crate::sim::Simulator;
