//! Error definitions for the harness.
//!
//! Every failure in the harness is terminal for the current process or session;
//! nothing here is retried. The types are:
//! 1. **`ConfigError`:** Invalid platform parameters, detected before any stepping.
//! 2. **`ProtocolError`:** Malformed commands, misframed packets and socket failures.
//! 3. **`EngineFault`:** The engine reported an internal exception rather than a guest trap.
//! 4. **`LoadError`:** ELF images that cannot be read or lack required symbols.
//! 5. **`SimError`:** The umbrella type returned by the execution loop and the CLI paths.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid platform configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// PMP entry count must be 0, 16 or 64.
    #[error("invalid PMP count {0}: must be 0, 16 or 64")]
    InvalidPmpCount(u64),

    /// PMP grain must be less than 64.
    #[error("invalid PMP grain {0}: must be less than 64")]
    InvalidPmpGrain(u64),

    /// Cache block size exponent exceeds 12 (4 KiB).
    #[error("invalid cache block size exponent {0}: must be at most 12")]
    InvalidCacheBlockSize(u64),

    /// Cache block size given in bytes is not a power of two.
    #[error("invalid cache block size {0}: must be a power of two")]
    CacheBlockNotPowerOfTwo(u64),

    /// RAM must not be empty.
    #[error("invalid RAM size: must be non-zero")]
    ZeroRamSize,

    /// Tick interval must be at least one instruction.
    #[error("instructions per tick must be at least 1")]
    ZeroInsnsPerTick,

    /// ELEN may not exceed VLEN.
    #[error("vector ELEN exponent {elen_exp} exceeds VLEN exponent {vlen_exp}")]
    InvalidVectorLengths {
        /// log2(VLEN).
        vlen_exp: u64,
        /// log2(ELEN).
        elen_exp: u64,
    },

    /// F/D and Zfinx share encodings and cannot both be enabled.
    #[error("F/D extensions and Zfinx cannot be enabled together")]
    FdextWithZfinx,

    /// The loaded image was built for a different register width.
    #[error("{elf}-bit ELF not supported by RV{model} model")]
    XlenMismatch {
        /// ELF class width.
        elf: u32,
        /// Model register width.
        model: u32,
    },

    /// An accepted co-simulation socket was in non-blocking mode.
    #[error("co-simulation socket is non-blocking")]
    NonBlockingSocket,
}

/// Fatal co-simulation protocol failure; the session aborts immediately.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The command record carried a tag the protocol does not define.
    #[error("unknown RVFI-DII command: {0:#04x}")]
    UnknownCommand(u8),

    /// The client requested a trace format other than 1 or 2.
    #[error("requested trace in unsupported format {0}")]
    UnsupportedVersion(u64),

    /// A packet's bit length is not byte aligned.
    #[error("trace packet not byte aligned: {bits} bits")]
    MisalignedPacket {
        /// Declared packet length in bits.
        bits: usize,
    },

    /// A packet exceeds the 4 KiB limit.
    #[error("unexpected large packet size (> 4KB): {bytes}")]
    OversizedPacket {
        /// Packet length in bytes.
        bytes: usize,
    },

    /// The socket accepted fewer bytes than the packet holds.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes in the packet.
        expected: usize,
        /// Bytes actually written.
        written: usize,
    },

    /// The stream closed partway through a command record.
    #[error("insufficient input: command record truncated after {0} bytes")]
    TruncatedCommand(usize),

    /// A received packet does not match its schema.
    #[error("malformed {schema} packet: {reason}")]
    Malformed {
        /// Schema name.
        schema: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// Socket I/O failed.
    #[error("socket I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// The engine reported an internal inconsistency during a step.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("engine exception at step {step}: {reason}")]
pub struct EngineFault {
    /// Step index at which the engine faulted.
    pub step: u64,
    /// Engine-provided description.
    pub reason: String,
}

/// Failure while loading an executable image.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("could not read '{path}': {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The file is not a parsable ELF image.
    #[error("could not parse ELF '{path}': {source}")]
    Parse {
        /// Offending path.
        path: PathBuf,
        /// Underlying parser error.
        source: object::Error,
    },

    /// A symbol the harness needs is missing.
    #[error("unable to locate symbol '{0}'")]
    MissingSymbol(&'static str),
}

/// Top-level harness error.
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration rejected before stepping.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Co-simulation session aborted.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Engine raised an internal exception.
    #[error(transparent)]
    Engine(#[from] EngineFault),

    /// Image loading failed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Log, signature or socket setup failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A step was requested after the loop reached a terminal state.
    #[error("execution loop already terminated")]
    Terminated,
}
