//! # Co-simulation Protocol Tests



/// Packet framing and command reads.
pub mod frame;


/// Command loop behavior over in-memory streams.
pub mod session;

/// Listener and single-client serving over loopback TCP.
pub mod server;

use rvcosim_core::rvfi::Command;

/// Concatenates encoded command records.
pub fn wire(commands: &[Command]) -> Vec<u8> {
    commands.iter().flat_map(|c| c.encode()).collect()
}
