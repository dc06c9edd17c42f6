//! Configuration system for the harness.
//!
//! This module defines the platform configuration the engine queries during execution.
//! It provides:
//! 1. **Defaults:** Baseline platform constants (memory map, extension toggles, CSR masks).
//! 2. **Structures:** Hierarchical config for ISA, PMP, vector, memory map, CSR and platform behavior.
//! 3. **Validation:** Rejection of invalid parameters before any instruction is stepped.
//!
//! Configuration is built once from defaults plus overrides (JSON and/or command-line flags)
//! and then frozen into a [`Platform`](crate::platform::Platform).

use serde::Deserialize;

use crate::common::constants::{COSIM_RAM_BASE, COSIM_RAM_SIZE};
use crate::common::error::ConfigError;

/// Default configuration constants for the platform.
///
/// These values match the reference platform the harness was written against.
mod defaults {
    /// Base address of main RAM (2 GiB).
    pub const RAM_BASE: u64 = 0x8000_0000;

    /// Size of main RAM (64 MiB).
    pub const RAM_SIZE: u64 = 0x400_0000;

    /// Base address of the boot ROM holding the reset vector.
    pub const ROM_BASE: u64 = 0x1000;

    /// Size of the boot ROM before the reset vector is installed.
    pub const ROM_SIZE: u64 = 0x100;

    /// Base address of the CLINT timer device.
    pub const CLINT_BASE: u64 = 0x0200_0000;

    /// Size of the CLINT MMIO window.
    pub const CLINT_SIZE: u64 = 0xC_0000;

    /// Host-target mailbox (`tohost`) address when no ELF symbol overrides it.
    pub const HTIF_TOHOST: u64 = 0x8000_1000;

    /// log2 of the cache block size (64 bytes).
    pub const CACHE_BLOCK_SIZE_EXP: u64 = 6;

    /// Physical address width in bits.
    pub const PA_BITS: u64 = 39;

    /// Implemented ASID bits.
    pub const ASID_BITS: u64 = 4;

    /// log2 of VLEN (512 bits).
    pub const VLEN_EXP: u64 = 9;

    /// log2 of ELEN (64 bits).
    pub const ELEN_EXP: u64 = 6;

    /// Retired instructions between clock/platform ticks.
    pub const INSNS_PER_TICK: u64 = 100;

    /// Mask of writable bits for the wide CSR masks.
    pub const ALL_WRITABLE: u64 = 0xFFFF_FFFF;
}

/// Active register width of the modeled hart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Xlen {
    /// 32-bit registers.
    #[serde(rename = "RV32", alias = "32")]
    Rv32,
    /// 64-bit registers.
    #[default]
    #[serde(rename = "RV64", alias = "64")]
    Rv64,
}

impl Xlen {
    /// Register width in bits.
    pub const fn bits(self) -> u32 {
        match self {
            Self::Rv32 => 32,
            Self::Rv64 => 64,
        }
    }

    /// Mask covering the active register width.
    pub const fn mask(self) -> u64 {
        match self {
            Self::Rv32 => 0xFFFF_FFFF,
            Self::Rv64 => u64::MAX,
        }
    }

    /// The `misa.MXL` / RVFI `ixl` encoding of this width.
    pub const fn mxl(self) -> u8 {
        match self {
            Self::Rv32 => 1,
            Self::Rv64 => 2,
        }
    }
}

/// Root configuration structure containing all platform settings.
///
/// # Examples
///
/// ```
/// use rvcosim_core::config::{PlatformConfig, Xlen};
///
/// let json = r#"{
///     "isa": { "xlen": "RV32", "enable_vext": false },
///     "memory": { "ram_size": 16777216 },
///     "platform": { "insns_per_tick": 1000 }
/// }"#;
///
/// let config = PlatformConfig::from_json(json).unwrap();
/// assert_eq!(config.isa.xlen, Xlen::Rv32);
/// assert!(!config.isa.enable_vext);
/// assert_eq!(config.memory.ram_base, 0x8000_0000);
/// assert_eq!(config.platform.insns_per_tick, 1000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlatformConfig {
    /// Register width and extension toggles.
    #[serde(default)]
    pub isa: IsaConfig,
    /// Physical memory protection parameters.
    #[serde(default)]
    pub pmp: PmpConfig,
    /// Vector extension parameters.
    #[serde(default)]
    pub vector: VectorConfig,
    /// Physical memory map.
    #[serde(default)]
    pub memory: MemoryMapConfig,
    /// CSR writable-bit masks.
    #[serde(default)]
    pub csr: CsrConfig,
    /// Platform behavior switches.
    #[serde(default)]
    pub platform: PlatformOptions,
}

impl PlatformConfig {
    /// Parses a configuration from JSON, filling omitted fields with defaults.
    ///
    /// # Errors
    ///
    /// Malformed JSON or a field of the wrong type.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Checks every parameter the engine relies on.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.pmp.count, 0 | 16 | 64) {
            return Err(ConfigError::InvalidPmpCount(self.pmp.count));
        }
        if self.pmp.grain >= 64 {
            return Err(ConfigError::InvalidPmpGrain(self.pmp.grain));
        }
        if self.memory.cache_block_size_exp > 12 {
            return Err(ConfigError::InvalidCacheBlockSize(
                self.memory.cache_block_size_exp,
            ));
        }
        if self.memory.ram_size == 0 {
            return Err(ConfigError::ZeroRamSize);
        }
        if self.platform.insns_per_tick == 0 {
            return Err(ConfigError::ZeroInsnsPerTick);
        }
        if self.vector.elen_exp > self.vector.vlen_exp {
            return Err(ConfigError::InvalidVectorLengths {
                vlen_exp: self.vector.vlen_exp,
                elen_exp: self.vector.elen_exp,
            });
        }
        if self.isa.enable_fdext && self.isa.enable_zfinx {
            return Err(ConfigError::FdextWithZfinx);
        }
        Ok(())
    }

    /// Sets the cache block size from a byte count.
    ///
    /// # Errors
    ///
    /// Fails unless `bytes` is a power of two no larger than 4 KiB.
    pub fn set_cache_block_size(&mut self, bytes: u64) -> Result<(), ConfigError> {
        if !bytes.is_power_of_two() {
            return Err(ConfigError::CacheBlockNotPowerOfTwo(bytes));
        }
        let exp = u64::from(bytes.trailing_zeros());
        if exp > 12 {
            return Err(ConfigError::InvalidCacheBlockSize(exp));
        }
        self.memory.cache_block_size_exp = exp;
        Ok(())
    }
}

/// Register width and ISA extension toggles.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct IsaConfig {
    /// Active register width.
    pub xlen: Xlen,
    /// Compressed instructions (C).
    pub enable_rvc: bool,
    /// Single/double floating point (F, D).
    pub enable_fdext: bool,
    /// Floating point in integer registers (Zfinx).
    pub enable_zfinx: bool,
    /// Vector extension (V).
    pub enable_vext: bool,
    /// Bit manipulation (B).
    pub enable_bext: bool,
    /// Address generation (Zba).
    pub enable_zba: bool,
    /// Basic bit manipulation (Zbb).
    pub enable_zbb: bool,
    /// Carry-less multiply (Zbc).
    pub enable_zbc: bool,
    /// Bit manipulation for cryptography (Zbkb).
    pub enable_zbkb: bool,
    /// Carry-less multiply for cryptography (Zbkc).
    pub enable_zbkc: bool,
    /// Single-bit instructions (Zbs).
    pub enable_zbs: bool,
    /// Half-precision floating point (Zfh).
    pub enable_zfh: bool,
    /// Minimal half-precision floating point (Zfhmin).
    pub enable_zfhmin: bool,
    /// Hardware performance counters (Zihpm).
    pub enable_zihpm: bool,
    /// Entropy source (Zkr).
    pub enable_zkr: bool,
    /// Fine-grained address-translation cache invalidation (Svinval).
    pub enable_svinval: bool,
    /// Additional compressed instructions (Zcb).
    pub enable_zcb: bool,
    /// Cache-block management (Zicbom).
    pub enable_zicbom: bool,
    /// Cache-block zero (Zicboz).
    pub enable_zicboz: bool,
    /// Supervisor timer compare (Sstc).
    pub enable_sstc: bool,
    /// Counter overflow and mode filtering (Sscofpmf).
    pub enable_sscofpmf: bool,
    /// Page-based memory types (Svpbmt).
    pub enable_pbmt: bool,
    /// NAPOT translation contiguity (Svnapot).
    pub enable_svnapot: bool,
    /// Sv32 translation.
    pub enable_sv32: bool,
    /// Sv39 translation.
    pub enable_sv39: bool,
    /// Sv48 translation.
    pub enable_sv48: bool,
    /// Sv57 translation.
    pub enable_sv57: bool,
    /// `misa` is writable.
    pub enable_writable_misa: bool,
    /// `menvcfg.FIOM` is writable.
    pub enable_writable_fiom: bool,
    /// `misa.X` (non-standard extensions present).
    pub misa_x: bool,
}

impl Default for IsaConfig {
    fn default() -> Self {
        Self {
            xlen: Xlen::default(),
            enable_rvc: true,
            enable_fdext: true,
            enable_zfinx: false,
            enable_vext: true,
            enable_bext: false,
            enable_zba: true,
            enable_zbb: true,
            enable_zbc: true,
            enable_zbkb: true,
            enable_zbkc: true,
            enable_zbs: true,
            enable_zfh: true,
            enable_zfhmin: true,
            enable_zihpm: true,
            enable_zkr: true,
            enable_svinval: false,
            enable_zcb: false,
            enable_zicbom: false,
            enable_zicboz: false,
            enable_sstc: false,
            enable_sscofpmf: true,
            enable_pbmt: true,
            enable_svnapot: true,
            enable_sv32: true,
            enable_sv39: true,
            enable_sv48: true,
            enable_sv57: true,
            enable_writable_misa: true,
            enable_writable_fiom: false,
            misa_x: true,
        }
    }
}

/// Physical memory protection parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PmpConfig {
    /// Number of PMP entries (0, 16 or 64).
    pub count: u64,
    /// PMP granularity exponent G (grain is 2^(G+2) bytes).
    pub grain: u64,
    /// Writable bits of the PMP address registers.
    pub writable: u64,
}

impl Default for PmpConfig {
    fn default() -> Self {
        Self {
            count: 0,
            grain: 0,
            writable: defaults::ALL_WRITABLE,
        }
    }
}

/// Vector extension parameters.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct VectorConfig {
    /// log2(VLEN).
    pub vlen_exp: u64,
    /// log2(ELEN).
    pub elen_exp: u64,
    /// Round `vl` up instead of down when AVL is between VLMAX and 2*VLMAX.
    pub vl_use_ceil: bool,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            vlen_exp: defaults::VLEN_EXP,
            elen_exp: defaults::ELEN_EXP,
            vl_use_ceil: false,
        }
    }
}

/// Physical memory map.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemoryMapConfig {
    /// Main RAM base address.
    pub ram_base: u64,
    /// Main RAM size in bytes.
    pub ram_size: u64,
    /// Boot ROM base address.
    pub rom_base: u64,
    /// Boot ROM size in bytes.
    pub rom_size: u64,
    /// CLINT base address.
    pub clint_base: u64,
    /// CLINT MMIO window size.
    pub clint_size: u64,
    /// Host-target mailbox address; zero disables the mailbox.
    pub htif_tohost: u64,
    /// log2 of the cache block size.
    pub cache_block_size_exp: u64,
    /// Physical address width.
    pub pa_bits: u64,
    /// Implemented ASID bits.
    pub asid_bits: u64,
}

impl MemoryMapConfig {
    /// Installs the fixed memory map used when an external client drives stepping.
    ///
    /// RAM is 8 MiB at `0x8000_0000`; there is no ROM, CLINT or mailbox.
    pub fn use_cosim_map(&mut self) {
        self.ram_base = COSIM_RAM_BASE;
        self.ram_size = COSIM_RAM_SIZE;
        self.rom_base = 0;
        self.rom_size = 0;
        self.clint_base = 0;
        self.clint_size = 0;
        self.htif_tohost = 0;
    }

    /// Sets RAM size in mebibytes.
    pub fn set_ram_size_mib(&mut self, mib: u64) {
        self.ram_size = mib << 20;
    }
}

impl Default for MemoryMapConfig {
    fn default() -> Self {
        Self {
            ram_base: defaults::RAM_BASE,
            ram_size: defaults::RAM_SIZE,
            rom_base: defaults::ROM_BASE,
            rom_size: defaults::ROM_SIZE,
            clint_base: defaults::CLINT_BASE,
            clint_size: defaults::CLINT_SIZE,
            htif_tohost: defaults::HTIF_TOHOST,
            cache_block_size_exp: defaults::CACHE_BLOCK_SIZE_EXP,
            pa_bits: defaults::PA_BITS,
            asid_bits: defaults::ASID_BITS,
        }
    }
}

/// CSR writable-bit masks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CsrConfig {
    /// Writable `mhpmcounter` bits.
    pub writable_hpm_counters: u64,
    /// Writable `mhpmevent` bits.
    pub hpmevent_writable_bits: u64,
    /// Writable `medeleg` bits.
    pub medeleg_writable_bits: u64,
    /// Writable `mideleg` bits.
    pub mideleg_writable_bits: u64,
    /// Implemented `xcause` bits.
    pub xcause_bits: u64,
    /// `mcountinhibit` bits forced to one.
    pub force_countinhibit_bits: u64,
    /// `mip.STIP` is writable.
    pub writable_stip: bool,
}

impl Default for CsrConfig {
    fn default() -> Self {
        Self {
            writable_hpm_counters: defaults::ALL_WRITABLE,
            hpmevent_writable_bits: defaults::ALL_WRITABLE,
            medeleg_writable_bits: defaults::ALL_WRITABLE,
            mideleg_writable_bits: defaults::ALL_WRITABLE,
            xcause_bits: defaults::ALL_WRITABLE,
            force_countinhibit_bits: 0,
            writable_stip: true,
        }
    }
}

/// Platform behavior switches.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlatformOptions {
    /// Hardware updates of page-table A/D bits.
    pub enable_dirty_update: bool,
    /// Misaligned data accesses are performed instead of trapping.
    pub enable_misaligned: bool,
    /// `mtval` holds the faulting instruction bits on illegal-instruction traps.
    pub mtval_has_illegal_inst_bits: bool,
    /// Retired instructions between clock/platform ticks.
    pub insns_per_tick: u64,
    /// Non-maskable interrupt handler address.
    pub nmi_handler: u64,
}

impl Default for PlatformOptions {
    fn default() -> Self {
        Self {
            enable_dirty_update: false,
            enable_misaligned: false,
            mtval_has_illegal_inst_bits: false,
            insns_per_tick: defaults::INSNS_PER_TICK,
            nmi_handler: 0,
        }
    }
}
