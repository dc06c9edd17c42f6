//! RVFI-DII co-simulation protocol engine.
//!
//! An external reference model drives the simulator one instruction at a time over a
//! byte stream and compares the returned traces against its own. This module provides:
//! 1. **Commands:** The fixed 8-byte command record and its tagged decoding.
//! 2. **Packets:** Version 1 and version 2 trace packet schemas with encode/decode.
//! 3. **Framing:** Alignment and size checks, zero padding, single-write delivery.
//! 4. **Sessions:** The command loop, version negotiation and the TCP server.
//!
//! Every protocol failure is fatal for the session; nothing is retried.

/// Least-significant-bit-first field packing.
pub mod bits;
/// Command record decoding.
pub mod command;
/// Packet framing on the wire.
pub mod frame;
/// Trace packet schemas.
pub mod packet;
/// TCP listener for co-simulation clients.
pub mod server;
/// The per-connection command loop.
pub mod session;
/// Per-step trace record filled by engines.
pub mod trace;

pub use self::command::Command;
pub use self::frame::RawPacket;
pub use self::packet::TraceVersion;
pub use self::session::{Session, SessionEnd};
pub use self::trace::RvfiTrace;
