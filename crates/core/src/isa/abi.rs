//! ABI register names.

/// Temporary register `t0` (x5).
pub const REG_T0: usize = 5;
/// Argument register `a0` (x10).
pub const REG_A0: usize = 10;
/// Argument register `a1` (x11).
pub const REG_A1: usize = 11;

/// ABI names indexed by register number.
pub const NAMES: [&str; 32] = [
    "zero", "ra", "sp", "gp", "tp", "t0", "t1", "t2", "s0", "s1", "a0", "a1", "a2", "a3", "a4",
    "a5", "a6", "a7", "s2", "s3", "s4", "s5", "s6", "s7", "s8", "s9", "s10", "s11", "t3", "t4",
    "t5", "t6",
];

/// ABI name of register `index`, or `"?"` when out of range.
pub fn name(index: usize) -> &'static str {
    NAMES.get(index).copied().unwrap_or("?")
}
