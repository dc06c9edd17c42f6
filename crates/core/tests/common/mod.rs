//! Shared fixtures for the harness tests.


use std::io;

use rvcosim_core::config::{PlatformConfig, Xlen};
use rvcosim_core::engine::reference::ReferenceEngine;
use rvcosim_core::isa::abi::{REG_A0, REG_T0};
use rvcosim_core::platform::Platform;
use rvcosim_core::sim::Simulator;
use rvcosim_core::sim::bootstrap::BootImage;
use rvcosim_core::sim::loader::Segment;

use self::builder::InstructionBuilder;
use self::engine::ScriptedEngine;

/// Default program load address.
pub const RAM_BASE: u64 = 0x8000_0000;

/// Default host-target mailbox address.
pub const TOHOST: u64 = 0x8000_1000;

/// Platform with default settings at the given width.
pub fn platform(xlen: Xlen) -> Platform {
    let mut config = PlatformConfig::default();
    config.isa.xlen = xlen;
    Platform::new(config).expect("default config is valid")
}

/// Platform with the given tick period.
pub fn platform_with_tick(insns_per_tick: u64) -> Platform {
    let mut config = PlatformConfig::default();
    config.platform.insns_per_tick = insns_per_tick;
    Platform::new(config).expect("tick period is valid")
}

/// Platform using the co-simulation memory map.
pub fn cosim_platform() -> Platform {
    let mut config = PlatformConfig::default();
    config.memory.use_cosim_map();
    Platform::new(config).expect("cosim config is valid")
}

/// Simulator around a scripted engine, booting directly at RAM base.
pub fn scripted_sim(engine: ScriptedEngine, platform: Platform) -> Simulator<ScriptedEngine> {
    Simulator::new(engine, platform, BootImage::direct(RAM_BASE))
}

/// Encodes `program` as little-endian words starting at RAM base.
pub fn program_segment(program: &[u32]) -> Segment {
    Segment {
        addr: RAM_BASE,
        bytes: program.iter().flat_map(|word| word.to_le_bytes()).collect(),
    }
}

/// Simulator around the reference engine with `program` loaded at RAM base.
pub fn reference_sim(program: &[u32], platform: Platform) -> Simulator<ReferenceEngine> {
    let engine = ReferenceEngine::with_terminal(Box::new(io::sink()));
    let boot = BootImage::direct(RAM_BASE).with_segments([program_segment(program)]);
    Simulator::new(engine, platform, boot)
}

/// Three instructions that report `code` through the mailbox at [`TOHOST`].
///
/// `index` is the word index of the first instruction within a program loaded
/// at RAM base; the store offset is computed from it.
pub fn htif_exit(code: i32, index: usize) -> [u32; 3] {
    let t0 = REG_T0 as u32;
    let a0 = REG_A0 as u32;
    let auipc_pc = RAM_BASE + 4 * (index as u64 + 1);
    let offset = (TOHOST as i64 - (auipc_pc as i64 + 0x1000)) as i32;
    [
        InstructionBuilder::new().addi(a0, 0, (code << 1) | 1).build(),
        InstructionBuilder::new().auipc(t0, 1).build(),
        InstructionBuilder::new().sw(t0, a0, offset).build(),
    ]
}
