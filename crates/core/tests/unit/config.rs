//! # Configuration Tests
//!
//! Defaults, JSON deserialization and validation of the platform configuration.

use pretty_assertions::assert_eq;
use rstest::rstest;
use rvcosim_core::common::error::ConfigError;
use rvcosim_core::config::{MemoryMapConfig, PlatformConfig, Xlen};

#[test]
fn test_config_default_is_valid() {
    let config = PlatformConfig::default();
    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.isa.xlen, Xlen::Rv64);
    assert_eq!(config.memory.ram_base, 0x8000_0000);
    assert_eq!(config.memory.ram_size, 0x400_0000);
    assert_eq!(config.memory.htif_tohost, 0x8000_1000);
    assert_eq!(config.memory.cache_block_size_exp, 6);
    assert_eq!(config.platform.insns_per_tick, 100);
}

#[test]
fn test_config_from_json_partial() {
    let json = r#"{
        "isa": { "xlen": "32", "enable_rvc": false },
        "pmp": { "count": 64 },
        "platform": { "insns_per_tick": 7 }
    }"#;
    let config = PlatformConfig::from_json(json).unwrap();
    assert_eq!(config.isa.xlen, Xlen::Rv32);
    assert!(!config.isa.enable_rvc);
    assert_eq!(config.pmp.count, 64);
    assert_eq!(config.platform.insns_per_tick, 7);
    assert_eq!(config.memory, MemoryMapConfig::default());
}

#[test]
fn test_config_from_json_rejects_unknown_width() {
    assert!(PlatformConfig::from_json(r#"{ "isa": { "xlen": "RV128" } }"#).is_err());
}

#[rstest]
#[case(0, true)]
#[case(16, true)]
#[case(64, true)]
#[case(8, false)]
#[case(32, false)]
fn test_pmp_count_validation(#[case] count: u64, #[case] valid: bool) {
    let mut config = PlatformConfig::default();
    config.pmp.count = count;
    let result = config.validate();
    if valid {
        assert_eq!(result, Ok(()));
    } else {
        assert_eq!(result, Err(ConfigError::InvalidPmpCount(count)));
    }
}

#[test]
fn test_pmp_grain_must_be_below_64() {
    let mut config = PlatformConfig::default();
    config.pmp.grain = 63;
    assert_eq!(config.validate(), Ok(()));
    config.pmp.grain = 64;
    assert_eq!(config.validate(), Err(ConfigError::InvalidPmpGrain(64)));
}

#[test]
fn test_zero_ram_and_zero_tick_rejected() {
    let mut config = PlatformConfig::default();
    config.memory.ram_size = 0;
    assert_eq!(config.validate(), Err(ConfigError::ZeroRamSize));

    let mut config = PlatformConfig::default();
    config.platform.insns_per_tick = 0;
    assert_eq!(config.validate(), Err(ConfigError::ZeroInsnsPerTick));
}

#[test]
fn test_elen_larger_than_vlen_rejected() {
    let mut config = PlatformConfig::default();
    config.vector.vlen_exp = 5;
    config.vector.elen_exp = 6;
    assert_eq!(
        config.validate(),
        Err(ConfigError::InvalidVectorLengths {
            vlen_exp: 5,
            elen_exp: 6
        })
    );
}

#[test]
fn test_fdext_and_zfinx_are_exclusive() {
    let mut config = PlatformConfig::default();
    config.isa.enable_zfinx = true;
    config.isa.enable_fdext = true;
    assert_eq!(config.validate(), Err(ConfigError::FdextWithZfinx));
    config.isa.enable_fdext = false;
    assert_eq!(config.validate(), Ok(()));
}

#[rstest]
#[case(1, 0)]
#[case(64, 6)]
#[case(4096, 12)]
fn test_cache_block_size_accepts_powers_of_two(#[case] bytes: u64, #[case] exp: u64) {
    let mut config = PlatformConfig::default();
    config.set_cache_block_size(bytes).unwrap();
    assert_eq!(config.memory.cache_block_size_exp, exp);
}

#[test]
fn test_cache_block_size_rejects_bad_values() {
    let mut config = PlatformConfig::default();
    assert_eq!(
        config.set_cache_block_size(48),
        Err(ConfigError::CacheBlockNotPowerOfTwo(48))
    );
    assert_eq!(
        config.set_cache_block_size(8192),
        Err(ConfigError::InvalidCacheBlockSize(13))
    );
    assert_eq!(config.memory.cache_block_size_exp, 6);
}

#[test]
fn test_cosim_map_overrides_memory_layout() {
    let mut memory = MemoryMapConfig::default();
    memory.use_cosim_map();
    assert_eq!(memory.ram_base, 0x8000_0000);
    assert_eq!(memory.ram_size, 0x80_0000);
    assert_eq!(memory.rom_size, 0);
    assert_eq!(memory.clint_size, 0);
    assert_eq!(memory.htif_tohost, 0);
}

#[test]
fn test_ram_size_in_mib() {
    let mut memory = MemoryMapConfig::default();
    memory.set_ram_size_mib(256);
    assert_eq!(memory.ram_size, 256 << 20);
}

#[test]
fn test_xlen_helpers() {
    assert_eq!(Xlen::Rv32.bits(), 32);
    assert_eq!(Xlen::Rv64.bits(), 64);
    assert_eq!(Xlen::Rv32.mask(), 0xFFFF_FFFF);
    assert_eq!(Xlen::Rv64.mask(), u64::MAX);
    assert_eq!(Xlen::Rv32.mxl(), 1);
    assert_eq!(Xlen::Rv64.mxl(), 2);
}
