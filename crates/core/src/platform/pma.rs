//! Physical Memory Attributes.
//!
//! A PMA region describes the access and caching policy of an address range. The
//! platform currently carries exactly one region spanning the address space with
//! every permission granted; lookups ignore the address. The table type exists so
//! a multi-region map can replace the single entry without changing callers.

/// Level of atomic memory operation support in a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AtomicSupport {
    /// No AMOs.
    None,
    /// `amoswap` only.
    Swap,
    /// Swap plus logical AMOs.
    Logical,
    /// All AMOs including arithmetic.
    Arithmetic,
}

impl AtomicSupport {
    /// Integer encoding handed to engines that take a raw value.
    pub const fn as_int(self) -> u64 {
        self as u64
    }
}

/// Load-reserved/store-conditional support in a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reservability {
    /// LR/SC not supported.
    None,
    /// Supported without an eventual-success guarantee.
    NonEventual,
    /// Supported with eventual success.
    Eventual,
}

impl Reservability {
    /// Integer encoding handed to engines that take a raw value.
    pub const fn as_int(self) -> u64 {
        self as u64
    }
}

/// What a misaligned access inside the region raises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MisalignmentPolicy {
    /// Misaligned accesses raise an access fault.
    pub causes_access_fault: bool,
    /// Misaligned accesses raise an address-misaligned fault.
    pub causes_alignment_fault: bool,
}

/// Attributes of one physical address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct PmaRegion {
    /// First address of the region.
    pub base: u64,
    /// Length of the region in bytes.
    pub size: u64,
    /// Cacheable.
    pub cacheable: bool,
    /// Coherent with other agents.
    pub coherent: bool,
    /// Instruction fetch permitted.
    pub executable: bool,
    /// Loads permitted.
    pub readable: bool,
    /// Stores permitted.
    pub writable: bool,
    /// Repeated reads return the same value.
    pub read_idempotent: bool,
    /// Repeated writes have the same effect.
    pub write_idempotent: bool,
    /// Relaxed memory ordering.
    pub relaxed: bool,
    /// `cbo.zero` permitted.
    pub supports_cbo_zero: bool,
    /// Capability tags may be stored.
    pub taggable: bool,
    /// Tagged accesses fault rather than clearing the tag.
    pub taggable_access_faults: bool,
    /// Misaligned-access behavior.
    pub misalignment: MisalignmentPolicy,
    /// LR/SC support.
    pub reservability: Reservability,
    /// AMO support.
    pub atomic_support: AtomicSupport,
}

impl PmaRegion {
    /// Size of the single default region.
    pub const DEFAULT_SIZE: u64 = 0xF000_0000;

    /// The all-permissive region used as the platform default.
    pub const fn permissive() -> Self {
        Self {
            base: 0,
            size: Self::DEFAULT_SIZE,
            cacheable: true,
            coherent: true,
            executable: true,
            readable: true,
            writable: true,
            read_idempotent: true,
            write_idempotent: true,
            relaxed: true,
            supports_cbo_zero: true,
            taggable: true,
            taggable_access_faults: false,
            misalignment: MisalignmentPolicy {
                causes_access_fault: false,
                causes_alignment_fault: false,
            },
            reservability: Reservability::Eventual,
            atomic_support: AtomicSupport::Arithmetic,
        }
    }
}

impl Default for PmaRegion {
    fn default() -> Self {
        Self::permissive()
    }
}

/// Ordered table of PMA regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmaTable {
    regions: Vec<PmaRegion>,
}

impl PmaTable {
    /// A table holding the single permissive region.
    pub fn single_permissive() -> Self {
        Self {
            regions: vec![PmaRegion::permissive()],
        }
    }

    /// Number of regions.
    pub fn count(&self) -> usize {
        self.regions.len()
    }

    /// Region by index.
    pub fn region(&self, index: usize) -> Option<&PmaRegion> {
        self.regions.get(index)
    }

    /// Attributes governing `addr`.
    ///
    /// With one region every address resolves to it, including addresses past
    /// its nominal size.
    pub fn lookup(&self, _addr: u64) -> &PmaRegion {
        &self.regions[0]
    }
}

impl Default for PmaTable {
    fn default() -> Self {
        Self::single_permissive()
    }
}
