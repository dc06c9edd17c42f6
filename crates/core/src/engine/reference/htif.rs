//! Host-Target Interface (HTIF) mailbox.
//!
//! Guest software signals the host by storing a command word to `tohost`:
//!
//! * bits 63:56 select the device, bits 55:48 the command, bits 47:0 the payload;
//! * device 0, command 0 with payload bit 0 set: exit with code `payload >> 1`;
//! * device 1, command 1: write the low payload byte to the terminal.
//!
//! Other commands are logged and ignored.

use tracing::debug;

/// Mask of the 48-bit payload field.
const PAYLOAD_MASK: u64 = 0x0000_FFFF_FFFF_FFFF;

/// What the host must do after a `tohost` store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtifEvent {
    /// Nothing to do.
    Idle,
    /// Guest requested exit with the given code.
    Exit(u64),
    /// Guest wrote a byte to the terminal.
    Putchar(u8),
}

/// Mailbox location and command decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Htif {
    tohost: Option<u64>,
}

impl Htif {
    /// Creates a mailbox at `tohost`, or a disabled one.
    pub const fn new(tohost: Option<u64>) -> Self {
        Self { tohost }
    }

    /// Mailbox address.
    pub const fn tohost(&self) -> Option<u64> {
        self.tohost
    }

    /// Whether a store of `len` bytes at `addr` touches the mailbox.
    pub const fn hit(&self, addr: u64, len: u64) -> bool {
        match self.tohost {
            Some(tohost) => addr < tohost.wrapping_add(8) && tohost < addr.wrapping_add(len),
            None => false,
        }
    }

    /// Decodes a mailbox value.
    pub fn decode(value: u64) -> HtifEvent {
        if value == 0 {
            return HtifEvent::Idle;
        }
        let device = value >> 56;
        let cmd = (value >> 48) & 0xFF;
        let payload = value & PAYLOAD_MASK;
        match (device, cmd) {
            (0, 0) if payload & 1 != 0 => HtifEvent::Exit(payload >> 1),
            (1, 1) => HtifEvent::Putchar(payload as u8),
            _ => {
                debug!(target: "platform", "htif: unhandled command {value:#018x}");
                HtifEvent::Idle
            }
        }
    }
}
