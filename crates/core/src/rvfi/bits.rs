//! Least-significant-bit-first field packing.
//!
//! Packet schemas are defined as sequences of fixed-width fields, the first field
//! occupying the least significant bits. [`BitWriter`] appends fields in that order
//! and [`BitReader`] consumes them back.

/// Appends fixed-width fields, least significant first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bits: usize,
}

impl BitWriter {
    /// Creates a writer with room for `bits` bits.
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bits.div_ceil(8)),
            bits: 0,
        }
    }

    /// Appends the low `width` bits of `value`; `width` is at most 64.
    pub fn push(&mut self, value: u64, width: u32) {
        let width = width.min(64);
        if self.bits % 8 == 0 && width % 8 == 0 {
            let bytes = value.to_le_bytes();
            self.bytes.extend_from_slice(&bytes[..(width / 8) as usize]);
            self.bits += width as usize;
            return;
        }
        for i in 0..width {
            let offset = self.bits % 8;
            if offset == 0 {
                self.bytes.push(0);
            }
            if (value >> i) & 1 != 0 {
                if let Some(last) = self.bytes.last_mut() {
                    *last |= 1 << offset;
                }
            }
            self.bits += 1;
        }
    }

    /// Appends each byte as an 8-bit field.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(u64::from(byte), 8);
        }
    }

    /// Appends `width` zero bits.
    pub fn pad(&mut self, width: u32) {
        let mut left = width;
        while left > 0 {
            let chunk = left.min(64);
            self.push(0, chunk);
            left -= chunk;
        }
    }

    /// Bits written so far.
    pub const fn bit_len(&self) -> usize {
        self.bits
    }

    /// The packed bytes; a partial final byte is zero-padded.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Consumes fixed-width fields, least significant first.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Reads from the start of `bytes`.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Takes the next `width` bits (at most 64), or `None` past the end.
    pub fn take(&mut self, width: u32) -> Option<u64> {
        let width = width.min(64);
        if self.remaining() < width as usize {
            return None;
        }
        let mut value = 0u64;
        for i in 0..width {
            let pos = self.pos + i as usize;
            let byte = self.bytes.get(pos / 8)?;
            if (byte >> (pos % 8)) & 1 != 0 {
                value |= 1 << i;
            }
        }
        self.pos += width as usize;
        Some(value)
    }

    /// Takes `N` whole bytes.
    pub fn take_bytes<const N: usize>(&mut self) -> Option<[u8; N]> {
        let mut out = [0u8; N];
        for byte in &mut out {
            *byte = self.take(8)? as u8;
        }
        Some(out)
    }

    /// Skips `width` bits.
    pub fn skip(&mut self, width: usize) -> Option<()> {
        if self.remaining() < width {
            return None;
        }
        self.pos += width;
        Some(())
    }

    /// Bits not yet consumed.
    pub const fn remaining(&self) -> usize {
        self.bytes.len() * 8 - self.pos
    }
}
