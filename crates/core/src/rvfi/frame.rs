//! Packet framing.
//!
//! A packet is delivered as exactly `bits / 8` bytes in a single write. The bit
//! length must be byte aligned and the byte length must not exceed 4 KiB; either
//! violation means the harness built a malformed packet and the session aborts.
//! Command records are read whole; a stream that closes between records ends the
//! session cleanly, one that closes inside a record does not.

use std::io::{ErrorKind, Read, Write};

use tracing::trace;

use crate::common::constants::{COMMAND_BYTES, MAX_PACKET_BYTES};
use crate::common::error::ProtocolError;
use crate::rvfi::bits::BitWriter;
use crate::rvfi::command::Command;

/// A packet ready for framing: a declared bit length and its packed bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    bits: usize,
    bytes: Vec<u8>,
}

impl RawPacket {
    /// A packet of `bits` bits; missing trailing bytes are sent as zero.
    pub const fn new(bits: usize, bytes: Vec<u8>) -> Self {
        Self { bits, bytes }
    }

    /// Declared length in bits.
    pub const fn bit_len(&self) -> usize {
        self.bits
    }

    /// Packed contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Checks the framing rules and returns the wire image.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MisalignedPacket`] when the bit length is not a multiple
    /// of 8, [`ProtocolError::OversizedPacket`] when it exceeds 4096 bytes.
    pub fn to_wire(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.bits % 8 != 0 {
            return Err(ProtocolError::MisalignedPacket { bits: self.bits });
        }
        let len = self.bits / 8;
        if len > MAX_PACKET_BYTES {
            return Err(ProtocolError::OversizedPacket { bytes: len });
        }
        let mut wire = vec![0u8; len];
        let copied = len.min(self.bytes.len());
        wire[..copied].copy_from_slice(&self.bytes[..copied]);
        Ok(wire)
    }
}

impl From<BitWriter> for RawPacket {
    fn from(writer: BitWriter) -> Self {
        let bits = writer.bit_len();
        Self::new(bits, writer.into_bytes())
    }
}

/// Sends `packet` with a single write.
///
/// Returns the number of bytes sent.
///
/// # Errors
///
/// Framing violations from [`RawPacket::to_wire`], [`ProtocolError::ShortWrite`]
/// when the sink accepts fewer bytes than the packet holds, and
/// [`ProtocolError::Io`] when the write fails.
pub fn send_packet<W: Write + ?Sized>(out: &mut W, packet: &RawPacket) -> Result<usize, ProtocolError> {
    let wire = packet.to_wire()?;
    trace!(target: "rvfi", "Sending packet with length {}...", wire.len());
    let written = out.write(&wire)?;
    if written != wire.len() {
        return Err(ProtocolError::ShortWrite {
            expected: wire.len(),
            written,
        });
    }
    trace!(target: "rvfi", "Wrote {written} byte response to socket.");
    Ok(written)
}

/// Sends raw bytes that are not a trace packet, such as the version acknowledgment.
///
/// # Errors
///
/// As for [`send_packet`].
pub fn send_bytes<W: Write + ?Sized>(out: &mut W, bytes: &[u8]) -> Result<(), ProtocolError> {
    let _ = send_packet(out, &RawPacket::new(bytes.len() * 8, bytes.to_vec()))?;
    Ok(())
}

/// Reads one command record.
///
/// Returns `Ok(None)` when the stream closes cleanly between records.
///
/// # Errors
///
/// [`ProtocolError::TruncatedCommand`] when the stream closes inside a record and
/// [`ProtocolError::Io`] on read failure.
pub fn read_command<R: Read + ?Sized>(input: &mut R) -> Result<Option<Command>, ProtocolError> {
    let mut buf = [0u8; COMMAND_BYTES];
    let mut filled = 0;
    while filled < COMMAND_BYTES {
        match input.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(ProtocolError::TruncatedCommand(filled)),
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err.into()),
        }
    }
    let command = Command::decode(buf);
    trace!(target: "rvfi", "Read cmd: {buf:02x?} -> {command:?}");
    Ok(Some(command))
}
