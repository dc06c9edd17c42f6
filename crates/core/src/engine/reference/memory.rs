//! Sparse physical memory.
//!
//! Backing store for every byte the guest or the bootstrap writes. Pages are
//! allocated on first write; reads of untouched memory return zero. No bounds or
//! permission checks happen here: the engine performs them against the platform
//! before calling in.

use std::collections::HashMap;

/// Page size of the backing store.
const PAGE_SIZE: usize = 4096;

/// Shift converting an address to its page number.
const PAGE_SHIFT: u32 = PAGE_SIZE.trailing_zeros();

/// Mask selecting the offset within a page.
const PAGE_MASK: u64 = PAGE_SIZE as u64 - 1;

/// Lazily allocated byte-addressable memory.
#[derive(Debug, Default, Clone)]
pub struct SparseMemory {
    pages: HashMap<u64, Box<[u8; PAGE_SIZE]>>,
}

impl SparseMemory {
    /// Creates an empty memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads one byte.
    pub fn read_u8(&self, addr: u64) -> u8 {
        self.pages
            .get(&(addr >> PAGE_SHIFT))
            .map_or(0, |page| page[(addr & PAGE_MASK) as usize])
    }

    /// Writes one byte.
    pub fn write_u8(&mut self, addr: u64, value: u8) {
        let page = self
            .pages
            .entry(addr >> PAGE_SHIFT)
            .or_insert_with(|| Box::new([0; PAGE_SIZE]));
        page[(addr & PAGE_MASK) as usize] = value;
    }

    /// Reads `len` bytes (at most 8) as a little-endian value.
    pub fn read(&self, addr: u64, len: u64) -> u64 {
        (0..len.min(8)).fold(0, |acc, i| {
            acc | (u64::from(self.read_u8(addr.wrapping_add(i))) << (8 * i))
        })
    }

    /// Writes the low `len` bytes (at most 8) of `value`, little-endian.
    pub fn write(&mut self, addr: u64, len: u64, value: u64) {
        for i in 0..len.min(8) {
            self.write_u8(addr.wrapping_add(i), (value >> (8 * i)) as u8);
        }
    }

    /// Copies `data` into memory starting at `addr`.
    pub fn write_bytes(&mut self, addr: u64, data: &[u8]) {
        for (addr, &byte) in (addr..).zip(data) {
            self.write_u8(addr, byte);
        }
    }

    /// Number of allocated pages.
    pub fn resident_pages(&self) -> usize {
        self.pages.len()
    }

    /// Drops every page.
    pub fn clear(&mut self) {
        self.pages.clear();
    }
}
