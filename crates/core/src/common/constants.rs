//! Global Harness Constants.
//!
//! This module defines constants used across the harness. It includes:
//! 1. **Boot Constants:** Reset-vector location and ROM alignment.
//! 2. **Co-simulation Constants:** Memory map used when a client drives stepping.
//! 3. **Protocol Constants:** Packet size limits and negotiation markers.

/// Default reset-vector (ROM) base address.
pub const DEFAULT_RSTVEC: u64 = 0x1000;

/// Alignment the ROM image is zero-filled to (one page).
pub const ROM_ALIGN: u64 = 0x1000;

/// Number of 32-bit words in the reset-vector trampoline.
pub const RST_VEC_WORDS: usize = 8;

/// Entry address used in co-simulation mode.
pub const COSIM_ENTRY: u64 = 0x8000_0000;

/// RAM base used in co-simulation mode.
pub const COSIM_RAM_BASE: u64 = 0x8000_0000;

/// RAM size used in co-simulation mode (8 MiB).
pub const COSIM_RAM_SIZE: u64 = 0x80_0000;

/// Largest trace packet the protocol engine will put on the wire, in bytes.
pub const MAX_PACKET_BYTES: usize = 4096;

/// Size of one command record on the wire, in bytes.
pub const COMMAND_BYTES: usize = 8;

/// Payload of an EndOfTrace command that is really a version-negotiation probe ("VERS").
pub const VERSION_PROBE: u32 = u32::from_be_bytes(*b"VERS");

/// Literal marker that opens a set-version acknowledgment.
pub const VERSION_ACK_MARKER: [u8; 8] = *b"version=";

/// `halt` byte of the capability packet; clients read 3 as "trace format v2 supported".
pub const V2_SUPPORT_MARKER: u8 = 0x03;

/// Number of retired instructions between periodic throughput reports.
pub const KIPS_REPORT_INTERVAL: u64 = 0x10_0000;
