//! Atomic memory operation arithmetic.

use crate::isa::opcodes::atomic::funct5;

/// Computes the value an AMO writes back.
///
/// # Arguments
///
/// * `op` - The AMO `funct5` selector.
/// * `old` - Value read from memory.
/// * `src` - Value of `rs2`.
/// * `word` - Operate on the low 32 bits with signed 32-bit comparisons.
///
/// # Returns
///
/// The new memory value, or `None` for a selector that is not an AMO.
pub fn amo_alu(op: u32, old: u64, src: u64, word: bool) -> Option<u64> {
    let (sold, ssrc, uold, usrc) = if word {
        (
            i64::from(old as i32),
            i64::from(src as i32),
            u64::from(old as u32),
            u64::from(src as u32),
        )
    } else {
        (old as i64, src as i64, old, src)
    };

    let result = match op {
        funct5::AMOSWAP => src,
        funct5::AMOADD => old.wrapping_add(src),
        funct5::AMOXOR => old ^ src,
        funct5::AMOAND => old & src,
        funct5::AMOOR => old | src,
        funct5::AMOMIN => sold.min(ssrc) as u64,
        funct5::AMOMAX => sold.max(ssrc) as u64,
        funct5::AMOMINU => uold.min(usrc),
        funct5::AMOMAXU => uold.max(usrc),
        _ => return None,
    };

    Some(if word { u64::from(result as u32) } else { result })
}
