//! Command records.
//!
//! Every client request is one 8-byte little-endian word:
//!
//! | bits    | field   |
//! |---------|---------|
//! | 31:0    | `insn`  |
//! | 47:32   | `time`  |
//! | 55:48   | `cmd`   |
//! | 63:56   | padding |
//!
//! The `cmd` byte selects the variant; unknown tags are kept so the session can
//! reject them explicitly.

use crate::common::constants::{COMMAND_BYTES, VERSION_PROBE};

/// Command tags.
pub mod tag {
    /// End the current trace, or probe for version support.
    pub const END_OF_TRACE: u8 = 0;
    /// Execute one injected instruction.
    pub const INSTRUCTION: u8 = 1;
    /// Select the trace packet format.
    pub const SET_VERSION: u8 = b'v';
}

/// The command record as laid out on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawCommand {
    /// Instruction encoding, or the command's 32-bit payload.
    pub insn: u32,
    /// Client timestamp; not interpreted.
    pub time: u16,
    /// Command tag.
    pub cmd: u8,
    /// Unused top byte.
    pub padding: u8,
}

impl RawCommand {
    /// Splits a received record into its fields.
    pub const fn from_bytes(bytes: [u8; COMMAND_BYTES]) -> Self {
        let word = u64::from_le_bytes(bytes);
        Self {
            insn: word as u32,
            time: (word >> 32) as u16,
            cmd: (word >> 48) as u8,
            padding: (word >> 56) as u8,
        }
    }

    /// Packs the fields into a record.
    pub const fn to_bytes(self) -> [u8; COMMAND_BYTES] {
        let word = (self.insn as u64)
            | ((self.time as u64) << 32)
            | ((self.cmd as u64) << 48)
            | ((self.padding as u64) << 56);
        word.to_le_bytes()
    }
}

/// A decoded client request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Inject `insn` for exactly one step.
    Instruction {
        /// Instruction encoding.
        insn: u32,
        /// Client timestamp.
        time: u16,
    },
    /// End the session, unless `payload` is the version probe.
    EndOfTrace {
        /// Accompanying 32-bit payload.
        payload: u32,
    },
    /// Use the given trace format for the rest of the connection.
    SetVersion(u32),
    /// A tag the protocol does not define.
    Unknown(u8),
}

impl Command {
    /// Decodes a raw record.
    pub const fn from_raw(raw: RawCommand) -> Self {
        match raw.cmd {
            tag::INSTRUCTION => Self::Instruction {
                insn: raw.insn,
                time: raw.time,
            },
            tag::END_OF_TRACE => Self::EndOfTrace { payload: raw.insn },
            tag::SET_VERSION => Self::SetVersion(raw.insn),
            other => Self::Unknown(other),
        }
    }

    /// Decodes an 8-byte record.
    pub const fn decode(bytes: [u8; COMMAND_BYTES]) -> Self {
        Self::from_raw(RawCommand::from_bytes(bytes))
    }

    /// Raw record for this command; an unknown tag carries a zero payload.
    pub const fn to_raw(self) -> RawCommand {
        let (insn, time, cmd) = match self {
            Self::Instruction { insn, time } => (insn, time, tag::INSTRUCTION),
            Self::EndOfTrace { payload } => (payload, 0, tag::END_OF_TRACE),
            Self::SetVersion(version) => (version, 0, tag::SET_VERSION),
            Self::Unknown(cmd) => (0, 0, cmd),
        };
        RawCommand {
            insn,
            time,
            cmd,
            padding: 0,
        }
    }

    /// Encodes the command as an 8-byte record.
    pub const fn encode(self) -> [u8; COMMAND_BYTES] {
        self.to_raw().to_bytes()
    }

    /// Whether this is an EndOfTrace carrying the "VERS" probe.
    pub const fn is_version_probe(&self) -> bool {
        matches!(self, Self::EndOfTrace { payload } if *payload == VERSION_PROBE)
    }

    /// Short name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Instruction { .. } => "instruction",
            Self::EndOfTrace { .. } => "end-of-trace",
            Self::SetVersion(_) => "set-version",
            Self::Unknown(_) => "unknown",
        }
    }
}
