//! Core Local Interruptor (CLINT).
//!
//! Memory-mapped timer and software-interrupt registers for the single hart.
//!
//! # Memory Map
//!
//! * `0x0000`: MSIP (Machine Software Interrupt Pending)
//! * `0x4000`: MTIMECMP (Machine Time Compare)
//! * `0xBFF8`: MTIME (Machine Time)
//!
//! `mtime` advances only on clock ticks, never with wall-clock time.

/// Offset of `msip`.
const MSIP_OFFSET: u64 = 0x0000;
/// Offset of `mtimecmp`.
const MTIMECMP_OFFSET: u64 = 0x4000;
/// Offset of `mtime`.
const MTIME_OFFSET: u64 = 0xBFF8;

/// CLINT register state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clint {
    msip: u32,
    mtimecmp: u64,
    mtime: u64,
}

impl Default for Clint {
    fn default() -> Self {
        Self {
            msip: 0,
            mtimecmp: u64::MAX,
            mtime: 0,
        }
    }
}

impl Clint {
    /// Reads `len` bytes at `offset` from the CLINT base.
    pub fn read(&self, offset: u64, len: u64) -> u64 {
        let (reg, base) = match offset {
            MSIP_OFFSET..=0x3 => (u64::from(self.msip), MSIP_OFFSET),
            MTIMECMP_OFFSET..=0x4007 => (self.mtimecmp, MTIMECMP_OFFSET),
            MTIME_OFFSET..=0xBFFF => (self.mtime, MTIME_OFFSET),
            _ => return 0,
        };
        let shift = (offset - base) * 8;
        let value = reg >> shift;
        if len >= 8 { value } else { value & ((1 << (len * 8)) - 1) }
    }

    /// Writes the low `len` bytes of `value` at `offset` from the CLINT base.
    pub fn write(&mut self, offset: u64, len: u64, value: u64) {
        match offset {
            MSIP_OFFSET => self.msip = (value & 1) as u32,
            MTIMECMP_OFFSET..=0x4007 => {
                self.mtimecmp = merge(self.mtimecmp, offset - MTIMECMP_OFFSET, len, value);
            }
            MTIME_OFFSET..=0xBFFF => {
                self.mtime = merge(self.mtime, offset - MTIME_OFFSET, len, value);
            }
            _ => {}
        }
    }

    /// Advances `mtime` by one.
    pub const fn tick(&mut self) {
        self.mtime = self.mtime.wrapping_add(1);
    }

    /// Current `mtime`.
    pub const fn mtime(&self) -> u64 {
        self.mtime
    }

    /// Whether the machine timer interrupt is pending.
    pub const fn timer_pending(&self) -> bool {
        self.mtime >= self.mtimecmp
    }

    /// Whether the machine software interrupt is pending.
    pub const fn software_pending(&self) -> bool {
        self.msip & 1 != 0
    }
}

/// Replaces `len` bytes of `reg` starting at byte `offset`.
fn merge(reg: u64, offset: u64, len: u64, value: u64) -> u64 {
    let shift = offset * 8;
    if shift >= 64 {
        return reg;
    }
    let width = (len * 8).min(64 - shift);
    let mask = if width >= 64 { u64::MAX } else { ((1 << width) - 1) << shift };
    (reg & !mask) | ((value << shift) & mask)
}
