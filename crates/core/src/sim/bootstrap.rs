//! Initial memory image.
//!
//! Before the first step the harness writes the program and, in file-driven mode,
//! a small boot ROM into the engine's memory. The boot ROM is:
//! 1. **Trampoline:** Eight words that load the hart id and DTB address into `a0`/`a1`
//!    and jump to the entry point stored in the last two words.
//! 2. **Device tree:** The DTB bytes, immediately after the trampoline.
//! 3. **Padding:** Zero fill up to the next page boundary, which fixes the ROM size.
//!
//! The image is kept after installation so a reinitialized machine starts from
//! exactly the same memory contents.

use crate::common::constants::{DEFAULT_RSTVEC, ROM_ALIGN, RST_VEC_WORDS};
use crate::config::Xlen;
use crate::engine::Engine;
use crate::sim::loader::Segment;

/// Builds the reset-vector trampoline jumping to `entry`.
pub const fn reset_vector(entry: u64, xlen: Xlen) -> [u32; RST_VEC_WORDS] {
    let load_entry = match xlen {
        Xlen::Rv32 => 0x0182_a283, // lw t0, 24(t0)
        Xlen::Rv64 => 0x0182_b283, // ld t0, 24(t0)
    };
    [
        0x0000_0297,                                        // auipc t0, 0
        0x0002_8593 + (((RST_VEC_WORDS * 4) as u32) << 20), // addi a1, t0, &dtb
        0xf140_2573,                                        // csrr a0, mhartid
        load_entry,
        0x0002_8067, // jr t0
        0,
        entry as u32,
        (entry >> 32) as u32,
    ]
}

/// Lays out the boot ROM: trampoline, DTB, then zero fill to a page boundary.
pub fn build_rom(entry: u64, xlen: Xlen, dtb: &[u8]) -> Vec<u8> {
    let mut rom: Vec<u8> = reset_vector(entry, xlen)
        .iter()
        .flat_map(|word| word.to_le_bytes())
        .collect();
    rom.extend_from_slice(dtb);
    let padded = (rom.len() as u64).next_multiple_of(ROM_ALIGN);
    rom.resize(padded as usize, 0);
    rom
}

/// Contents written to memory before the first step, plus the boot PC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootImage {
    segments: Vec<Segment>,
    rom: Option<Segment>,
    start_pc: u64,
}

impl BootImage {
    /// Starts directly at `entry` with no ROM, as in co-simulation mode.
    pub const fn direct(entry: u64) -> Self {
        Self {
            segments: Vec::new(),
            rom: None,
            start_pc: entry,
        }
    }

    /// Boots through a reset-vector ROM at the default ROM base.
    ///
    /// # Arguments
    ///
    /// * `entry` - Address the trampoline jumps to.
    /// * `xlen` - Model width; selects `lw` or `ld` for the entry load.
    /// * `dtb` - Device tree blob placed after the trampoline (may be empty).
    pub fn reset_vector(entry: u64, xlen: Xlen, dtb: &[u8]) -> Self {
        Self {
            segments: Vec::new(),
            rom: Some(Segment {
                addr: DEFAULT_RSTVEC,
                bytes: build_rom(entry, xlen, dtb),
            }),
            start_pc: DEFAULT_RSTVEC,
        }
    }

    /// Adds program segments, written before the ROM.
    #[must_use]
    pub fn with_segments(mut self, segments: impl IntoIterator<Item = Segment>) -> Self {
        self.segments.extend(segments);
        self
    }

    /// ROM base and padded length, if the image has a ROM.
    pub fn rom_extent(&self) -> Option<(u64, u64)> {
        self.rom
            .as_ref()
            .map(|rom| (rom.addr, rom.bytes.len() as u64))
    }

    /// Program segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// PC the first step executes from.
    pub const fn start_pc(&self) -> u64 {
        self.start_pc
    }

    /// Writes the image into `engine` and sets the boot PC.
    pub fn apply<E: Engine + ?Sized>(&self, engine: &mut E) {
        for segment in self.segments.iter().chain(self.rom.as_ref()) {
            for (addr, &byte) in (segment.addr..).zip(&segment.bytes) {
                engine.write_mem(addr, byte);
            }
        }
        engine.set_pc(self.start_pc);
    }
}
