//! # Boot, Loader and Signature Tests

use std::fs;
use std::num::NonZeroU64;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use rvcosim_core::common::error::{ConfigError, LoadError, SimError};
use rvcosim_core::config::{PlatformConfig, Xlen};
use rvcosim_core::engine::Engine;
use rvcosim_core::engine::reference::ReferenceEngine;
use rvcosim_core::platform::Platform;
use rvcosim_core::sim::bootstrap::{BootImage, build_rom, reset_vector};
use rvcosim_core::sim::loader::{LoadedElf, ProgramImage, Segment, load_elf};
use rvcosim_core::sim::signature::{SignatureRegion, render_signature, write_signature};
use rvcosim_core::sim::{RunOutcome, Simulator};
use tempfile::TempDir;

use crate::common::elf::{ElfSpec, build_elf64};
use crate::common::engine::ScriptedEngine;
use crate::common::{RAM_BASE, TOHOST, htif_exit, platform, scripted_sim};

fn granularity(n: u64) -> NonZeroU64 {
    NonZeroU64::new(n).unwrap()
}

fn write_temp(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, bytes).unwrap();
    path
}

// --- Boot ROM ---

#[test]
fn test_reset_vector_words() {
    let words = reset_vector(0x8000_0000, Xlen::Rv64);
    assert_eq!(
        words,
        [
            0x0000_0297,
            0x0202_8593,
            0xf140_2573,
            0x0182_b283,
            0x0002_8067,
            0,
            0x8000_0000,
            0,
        ]
    );
    assert_eq!(reset_vector(0x1_2345_6780, Xlen::Rv32)[3], 0x0182_a283);
    assert_eq!(reset_vector(0x1_2345_6780, Xlen::Rv32)[6..], [0x2345_6780, 1]);
}

#[test]
fn test_rom_is_padded_to_page() {
    let rom = build_rom(0x8000_0000, Xlen::Rv64, &[]);
    assert_eq!(rom.len(), 0x1000);

    let dtb = vec![0xD0; 0x1000];
    let rom = build_rom(0x8000_0000, Xlen::Rv64, &dtb);
    assert_eq!(rom.len(), 0x2000);
    assert_eq!(&rom[32..36], &[0xD0; 4]);
    assert_eq!(rom[0x1020], 0);
}

#[test]
fn test_boot_image_installs_segments_then_rom() {
    let boot = BootImage::reset_vector(0x8000_0000, Xlen::Rv64, &[0xAB]).with_segments([Segment {
        addr: RAM_BASE,
        bytes: vec![1, 2, 3],
    }]);
    assert_eq!(boot.rom_extent(), Some((0x1000, 0x1000)));
    assert_eq!(boot.start_pc(), 0x1000);

    let sim = scripted_sim(ScriptedEngine::new(), platform(Xlen::Rv64));
    let mut engine = sim.into_engine();
    boot.apply(&mut engine);
    assert_eq!(engine.read_mem(RAM_BASE + 2), 3);
    assert_eq!(engine.read_mem(0x1000), 0x97);
    assert_eq!(engine.read_mem(0x1020), 0xAB);
    assert_eq!(engine.pc(), 0x1000);
}

#[test]
fn test_direct_boot_has_no_rom() {
    let boot = BootImage::direct(0x8000_0000);
    assert_eq!(boot.rom_extent(), None);
    assert!(boot.segments().is_empty());
    assert_eq!(boot.start_pc(), 0x8000_0000);
}

// --- ELF loading ---

#[test]
fn test_parse_elf_segments_and_symbols() {
    let code = [0x13, 0, 0, 0, 0x73, 0, 0, 0];
    let image = build_elf64(&ElfSpec {
        entry: RAM_BASE,
        load_addr: RAM_BASE,
        code: &code,
        bss: 8,
        symbols: &[("tohost", TOHOST), ("begin_signature", RAM_BASE + 0x100)],
    });
    let elf = LoadedElf::parse(&image).unwrap();

    assert!(!elf.is_32bit);
    assert_eq!(elf.entry, RAM_BASE);
    assert_eq!(elf.segments.len(), 1);
    assert_eq!(elf.segments[0].addr, RAM_BASE);
    assert_eq!(elf.segments[0].bytes.len(), 16);
    assert_eq!(&elf.segments[0].bytes[..8], &code);
    assert_eq!(&elf.segments[0].bytes[8..], &[0; 8]);
    assert_eq!(elf.lookup_symbol("tohost"), Some(TOHOST));
    assert_eq!(elf.lookup_symbol("end_signature"), None);
    assert!(matches!(
        elf.require_symbol("end_signature"),
        Err(LoadError::MissingSymbol("end_signature"))
    ));
}

#[test]
fn test_elf_width_must_match_model() {
    let image = build_elf64(&ElfSpec {
        entry: RAM_BASE,
        load_addr: RAM_BASE,
        code: &[0x13, 0, 0, 0],
        bss: 0,
        symbols: &[],
    });
    let elf = LoadedElf::parse(&image).unwrap();
    assert_eq!(elf.check_xlen(Xlen::Rv64), Ok(()));
    assert_eq!(
        elf.check_xlen(Xlen::Rv32),
        Err(ConfigError::XlenMismatch { elf: 64, model: 32 })
    );
}

#[test]
fn test_load_rejects_non_elf() {
    let dir = TempDir::new().unwrap();
    let path = write_temp(&dir, "garbage.elf", b"definitely not an ELF file");
    assert!(matches!(load_elf(&path), Err(LoadError::Parse { .. })));

    let missing = dir.path().join("missing.elf");
    assert!(matches!(load_elf(&missing), Err(LoadError::Io { .. })));
}

#[test]
fn test_program_image_requires_tohost() {
    let dir = TempDir::new().unwrap();
    let image = build_elf64(&ElfSpec {
        entry: RAM_BASE,
        load_addr: RAM_BASE,
        code: &[0x13, 0, 0, 0],
        bss: 0,
        symbols: &[],
    });
    let path = write_temp(&dir, "no_tohost.elf", &image);
    assert!(matches!(
        ProgramImage::load(&path, &[], Xlen::Rv64),
        Err(SimError::Load(LoadError::MissingSymbol("tohost")))
    ));
}

#[test]
fn test_program_image_merges_extra_files() {
    let dir = TempDir::new().unwrap();
    let main = write_temp(
        &dir,
        "main.elf",
        &build_elf64(&ElfSpec {
            entry: RAM_BASE,
            load_addr: RAM_BASE,
            code: &[0x13, 0, 0, 0],
            bss: 0,
            symbols: &[("tohost", TOHOST), ("begin_signature", RAM_BASE + 0x10)],
        }),
    );
    let extra = write_temp(
        &dir,
        "extra.elf",
        &build_elf64(&ElfSpec {
            entry: 0x8010_0000,
            load_addr: 0x8010_0000,
            code: &[0xFF; 4],
            bss: 0,
            symbols: &[("tohost", 0x8010_1000)],
        }),
    );

    let image = ProgramImage::load(&main, &[extra], Xlen::Rv64).unwrap();
    assert_eq!(image.entry, RAM_BASE);
    assert_eq!(image.tohost, TOHOST);
    assert_eq!(image.segments.len(), 2);
    assert_eq!(image.segments[1].addr, 0x8010_0000);
    assert_eq!(
        image.signature_region(),
        SignatureRegion {
            begin: RAM_BASE + 0x10,
            end: 0
        }
    );
    assert!(!image.signature_region().is_valid());
}

// --- Signatures ---

fn engine_with_words(words: &[(u64, u32)]) -> ScriptedEngine {
    let mut engine = scripted_sim(ScriptedEngine::new(), platform(Xlen::Rv64)).into_engine();
    for &(addr, word) in words {
        for (i, byte) in word.to_le_bytes().into_iter().enumerate() {
            engine.write_mem(addr + i as u64, byte);
        }
    }
    engine
}

#[test]
fn test_render_signature_msb_first() {
    let engine = engine_with_words(&[(0x100, 0xDEAD_BEEF), (0x104, 0x0000_0001)]);
    let mut out = Vec::new();
    let region = SignatureRegion {
        begin: 0x100,
        end: 0x108,
    };
    render_signature(&mut out, &engine, region, granularity(4)).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "deadbeef\n00000001\n");

    let mut out = Vec::new();
    render_signature(&mut out, &engine, region, granularity(8)).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "00000001deadbeef\n");
}

#[test]
fn test_render_signature_last_word_may_overrun() {
    let engine = engine_with_words(&[(0x200, 0x1122_3344)]);
    let mut out = Vec::new();
    let region = SignatureRegion {
        begin: 0x200,
        end: 0x202,
    };
    render_signature(&mut out, &engine, region, granularity(4)).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "11223344\n");
}

#[test]
fn test_write_signature_skips_invalid_region() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sig.txt");
    let engine = engine_with_words(&[]);
    let region = SignatureRegion { begin: 8, end: 8 };

    assert!(!write_signature(&path, &engine, region, granularity(4)).unwrap());
    assert!(!path.exists());
}

// --- End to end ---

#[test]
fn test_elf_boots_through_rom_and_dumps_signature() {
    let mut words: Vec<u32> = htif_exit(0, 0).to_vec();
    words.resize(0x40, 0x0000_0013);
    words.extend([0xDEAD_BEEF, 0x00C0_FFEE]);
    let code: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();

    let dir = TempDir::new().unwrap();
    let path = write_temp(
        &dir,
        "program.elf",
        &build_elf64(&ElfSpec {
            entry: RAM_BASE,
            load_addr: RAM_BASE,
            code: &code,
            bss: 0,
            symbols: &[
                ("tohost", TOHOST),
                ("begin_signature", RAM_BASE + 0x100),
                ("end_signature", RAM_BASE + 0x108),
            ],
        }),
    );

    let image = ProgramImage::load(&path, &[], Xlen::Rv64).unwrap();
    let boot = BootImage::reset_vector(image.entry, Xlen::Rv64, &[])
        .with_segments(image.segments.clone());
    let (rom_base, rom_size) = boot.rom_extent().unwrap();

    let mut config = PlatformConfig::default();
    config.memory.htif_tohost = image.tohost;
    config.memory.rom_base = rom_base;
    config.memory.rom_size = rom_size;
    let platform = Platform::new(config).unwrap();

    let engine = ReferenceEngine::with_terminal(Box::new(std::io::sink()));
    let mut sim = Simulator::new(engine, platform, boot);
    assert_eq!(sim.run().unwrap(), RunOutcome::Halted { exit_code: 0 });
    // Five trampoline instructions, then the three-instruction exit.
    assert_eq!(sim.counters().total_insns, 8);
    assert_eq!(sim.engine().reg(11), 0x1020, "a1 points at the DTB");

    let sig = dir.path().join("program.sig");
    assert!(write_signature(&sig, sim.engine(), image.signature_region(), granularity(4)).unwrap());
    assert_eq!(fs::read_to_string(&sig).unwrap(), "deadbeef\n00c0ffee\n");
}
