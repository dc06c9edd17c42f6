//! # Platform Tests
//!
//! Accessors, range checks and memory attributes of a frozen platform.

use pretty_assertions::assert_eq;
use rvcosim_core::common::error::ConfigError;
use rvcosim_core::config::{PlatformConfig, Xlen};
use rvcosim_core::platform::{AtomicSupport, Platform, PmaRegion, PmaTable, Reservability};

use crate::common::{cosim_platform, platform};

#[test]
fn test_platform_rejects_invalid_config() {
    let mut config = PlatformConfig::default();
    config.pmp.count = 3;
    assert_eq!(Platform::new(config), Err(ConfigError::InvalidPmpCount(3)));
}

#[test]
fn test_platform_accessors_follow_config() {
    let mut config = PlatformConfig::default();
    config.isa.xlen = Xlen::Rv32;
    config.pmp.count = 64;
    config.pmp.grain = 2;
    config.platform.enable_misaligned = true;
    config.platform.mtval_has_illegal_inst_bits = true;
    config.platform.insns_per_tick = 42;
    let platform = Platform::new(config).unwrap();

    assert_eq!(platform.xlen(), Xlen::Rv32);
    assert_eq!(platform.pmp_count(), 64);
    assert_eq!(platform.pmp_grain(), 2);
    assert!(platform.enable_misaligned_access());
    assert!(platform.mtval_has_illegal_inst_bits());
    assert_eq!(platform.insns_per_tick().get(), 42);
    assert_eq!(platform.cache_block_size_exp(), 6);
    assert_eq!(platform.htif_tohost(), Some(0x8000_1000));
}

#[test]
fn test_cosim_platform_has_no_mailbox_or_rom() {
    let platform = cosim_platform();
    assert_eq!(platform.htif_tohost(), None);
    assert_eq!(platform.ram_base(), 0x8000_0000);
    assert_eq!(platform.ram_size(), 0x80_0000);
    assert!(!platform.within_rom(0x1000, 4));
    assert!(!platform.within_clint(0x0200_0000, 8));
}

#[test]
fn test_range_checks() {
    let platform = platform(Xlen::Rv64);
    let ram_end = platform.ram_base() + platform.ram_size();

    assert!(platform.within_ram(platform.ram_base(), 8));
    assert!(platform.within_ram(ram_end - 8, 8));
    assert!(!platform.within_ram(ram_end - 4, 8));
    assert!(!platform.within_ram(platform.ram_base() - 1, 1));
    assert!(!platform.within_ram(u64::MAX, 2));

    assert!(platform.within_rom(platform.rom_base(), 4));
    assert!(platform.within_phys_mem(platform.rom_base(), 4));
    assert!(platform.within_clint(platform.clint_base() + 0xBFF8, 8));
    assert!(!platform.within_phys_mem(platform.clint_base(), 4));
}

#[test]
fn test_pma_is_single_permissive_region() {
    let platform = platform(Xlen::Rv64);
    assert_eq!(platform.pma_table().count(), 1);

    for addr in [0, 0x8000_0000, 0xEFFF_FFFF, 0xF000_0000, u64::MAX] {
        let region = platform.pma(addr);
        assert_eq!(*region, PmaRegion::permissive());
    }

    let region = PmaRegion::permissive();
    assert_eq!(region.base, 0);
    assert_eq!(region.size, 0xF000_0000);
    assert!(region.executable && region.readable && region.writable);
    assert!(!region.taggable_access_faults);
    assert!(!region.misalignment.causes_access_fault);
    assert!(!region.misalignment.causes_alignment_fault);
    assert_eq!(region.reservability, Reservability::Eventual);
    assert_eq!(region.atomic_support, AtomicSupport::Arithmetic);
}

#[test]
fn test_pma_table_indexing() {
    let table = PmaTable::default();
    assert!(table.region(0).is_some());
    assert!(table.region(1).is_none());
    assert_eq!(Reservability::Eventual.as_int(), 2);
    assert_eq!(AtomicSupport::Arithmetic.as_int(), 3);
}
