//! Platform model.
//!
//! The [`Platform`] is the frozen form of a validated [`PlatformConfig`]. Engines
//! query it during every step for feature toggles, the memory map and the physical
//! memory attributes of an address; nothing may mutate it while stepping.

/// Physical memory attribute regions.
pub mod pma;

use std::num::NonZeroU64;

use crate::common::error::ConfigError;
use crate::config::{PlatformConfig, Xlen};

pub use pma::{AtomicSupport, MisalignmentPolicy, PmaRegion, PmaTable, Reservability};

/// Read-only platform configuration and memory map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    config: PlatformConfig,
    pma: PmaTable,
}

impl Platform {
    /// Validates `config` and freezes it.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] reported by [`PlatformConfig::validate`].
    pub fn new(config: PlatformConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            pma: PmaTable::single_permissive(),
        })
    }

    /// Full configuration record.
    #[inline]
    pub const fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// Active register width.
    #[inline]
    pub const fn xlen(&self) -> Xlen {
        self.config.isa.xlen
    }

    /// RAM base address.
    #[inline]
    pub const fn ram_base(&self) -> u64 {
        self.config.memory.ram_base
    }

    /// RAM size in bytes.
    #[inline]
    pub const fn ram_size(&self) -> u64 {
        self.config.memory.ram_size
    }

    /// ROM base address.
    #[inline]
    pub const fn rom_base(&self) -> u64 {
        self.config.memory.rom_base
    }

    /// ROM size in bytes.
    #[inline]
    pub const fn rom_size(&self) -> u64 {
        self.config.memory.rom_size
    }

    /// CLINT base address.
    #[inline]
    pub const fn clint_base(&self) -> u64 {
        self.config.memory.clint_base
    }

    /// CLINT window size.
    #[inline]
    pub const fn clint_size(&self) -> u64 {
        self.config.memory.clint_size
    }

    /// Host-target mailbox address, if the mailbox is enabled.
    #[inline]
    pub const fn htif_tohost(&self) -> Option<u64> {
        match self.config.memory.htif_tohost {
            0 => None,
            addr => Some(addr),
        }
    }

    /// log2 of the cache block size.
    #[inline]
    pub const fn cache_block_size_exp(&self) -> u64 {
        self.config.memory.cache_block_size_exp
    }

    /// PMP entry count.
    #[inline]
    pub const fn pmp_count(&self) -> u64 {
        self.config.pmp.count
    }

    /// PMP granularity exponent.
    #[inline]
    pub const fn pmp_grain(&self) -> u64 {
        self.config.pmp.grain
    }

    /// Whether misaligned data accesses are performed in hardware.
    #[inline]
    pub const fn enable_misaligned_access(&self) -> bool {
        self.config.platform.enable_misaligned
    }

    /// Whether `mtval` records the bits of an illegal instruction.
    #[inline]
    pub const fn mtval_has_illegal_inst_bits(&self) -> bool {
        self.config.platform.mtval_has_illegal_inst_bits
    }

    /// Retired instructions between ticks; never zero once validated.
    #[inline]
    pub fn insns_per_tick(&self) -> NonZeroU64 {
        NonZeroU64::new(self.config.platform.insns_per_tick).unwrap_or(NonZeroU64::MIN)
    }

    /// PMA table.
    #[inline]
    pub const fn pma_table(&self) -> &PmaTable {
        &self.pma
    }

    /// Physical memory attributes at `addr`.
    #[inline]
    pub fn pma(&self, addr: u64) -> &PmaRegion {
        self.pma.lookup(addr)
    }

    /// Whether `[addr, addr + len)` lies inside RAM.
    pub fn within_ram(&self, addr: u64, len: u64) -> bool {
        within(self.ram_base(), self.ram_size(), addr, len)
    }

    /// Whether `[addr, addr + len)` lies inside ROM.
    pub fn within_rom(&self, addr: u64, len: u64) -> bool {
        within(self.rom_base(), self.rom_size(), addr, len)
    }

    /// Whether `[addr, addr + len)` lies inside RAM or ROM.
    pub fn within_phys_mem(&self, addr: u64, len: u64) -> bool {
        self.within_ram(addr, len) || self.within_rom(addr, len)
    }

    /// Whether `[addr, addr + len)` lies inside the CLINT window.
    pub fn within_clint(&self, addr: u64, len: u64) -> bool {
        within(self.clint_base(), self.clint_size(), addr, len)
    }
}

/// Range containment without overflow; empty regions contain nothing.
fn within(base: u64, size: u64, addr: u64, len: u64) -> bool {
    let (base, size, addr, len) = (
        u128::from(base),
        u128::from(size),
        u128::from(addr),
        u128::from(len),
    );
    size != 0 && addr >= base && addr + len <= base + size
}
