//! Test-signature output.
//!
//! Compliance tests leave their results in memory between `begin_signature` and
//! `end_signature`. After the run the region is dumped as one hex word per line,
//! most-significant byte first.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::num::NonZeroU64;
use std::path::Path;

use tracing::warn;

use crate::engine::Engine;

/// Byte range `[begin, end)` holding the test signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignatureRegion {
    /// First byte.
    pub begin: u64,
    /// One past the last byte.
    pub end: u64,
}

impl SignatureRegion {
    /// Whether the region holds at least one byte.
    pub const fn is_valid(&self) -> bool {
        self.begin < self.end
    }
}

/// Writes the signature region to `out`.
///
/// Each line holds `granularity` bytes starting at the line's address, printed
/// most-significant byte first as lowercase hex. The last word may read past `end`.
///
/// # Errors
///
/// Any write error from `out`.
pub fn render_signature<W: Write, E: Engine + ?Sized>(
    out: &mut W,
    engine: &E,
    region: SignatureRegion,
    granularity: NonZeroU64,
) -> io::Result<()> {
    let step = granularity.get();
    let mut addr = region.begin;
    while addr < region.end {
        for offset in (0..step).rev() {
            write!(out, "{:02x}", engine.read_mem(addr.wrapping_add(offset)))?;
        }
        writeln!(out)?;
        addr = addr.saturating_add(step);
    }
    Ok(())
}

/// Writes the signature region to the file at `path`.
///
/// Returns `Ok(false)` without creating the file when the region is empty or inverted.
///
/// # Errors
///
/// Failure to create or write the file.
pub fn write_signature<E: Engine + ?Sized>(
    path: &Path,
    engine: &E,
    region: SignatureRegion,
    granularity: NonZeroU64,
) -> io::Result<bool> {
    if !region.is_valid() {
        warn!(
            "Invalid signature region [{:#x},{:#x}] to {}.",
            region.begin,
            region.end,
            path.display()
        );
        return Ok(false);
    }
    let mut out = BufWriter::new(File::create(path)?);
    render_signature(&mut out, engine, region, granularity)?;
    out.flush()?;
    Ok(true)
}
