//! The per-connection command loop.
//!
//! A connection carries a sequence of trace sessions. Each session is a run of
//! commands ending with a non-probe EndOfTrace; between sessions the machine is
//! reinitialized. The negotiated trace version belongs to the connection and
//! survives across sessions, as does the instruction limit.
//!
//! The client owns session boundaries: a guest exit through the mailbox is logged
//! and stepping continues on the same machine.

use std::io::{Read, Write};

use tracing::{debug, info, trace, warn};

use crate::common::constants::VERSION_ACK_MARKER;
use crate::common::error::{ProtocolError, SimError};
use crate::engine::RvfiEngine;
use crate::rvfi::command::Command;
use crate::rvfi::frame::{read_command, send_bytes, send_packet};
use crate::rvfi::packet::{ExecPacketV1, Packet, TraceVersion, encode_trace};
use crate::sim::{Simulator, StepStatus};

/// Why a trace session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The client sent EndOfTrace; the final halted packet was delivered.
    EndOfTrace,
    /// The connection retired as many instructions as the simulator allows.
    LimitReached {
        /// Instructions retired on this connection.
        retired: u64,
    },
    /// The client closed the stream between commands.
    Disconnected,
}

/// Protocol state for one client connection.
#[derive(Debug)]
pub struct Session<R, W> {
    reader: R,
    writer: W,
    version: TraceVersion,
    sessions: u64,
    retired: u64,
}

impl<R: Read, W: Write> Session<R, W> {
    /// Starts a connection in trace format version 1.
    pub const fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            version: TraceVersion::V1,
            sessions: 0,
            retired: 0,
        }
    }

    /// Trace format currently in use.
    pub const fn version(&self) -> TraceVersion {
        self.version
    }

    /// Trace sessions completed on this connection.
    pub const fn sessions(&self) -> u64 {
        self.sessions
    }

    /// The read half, for inspecting how much was consumed.
    pub const fn reader(&self) -> &R {
        &self.reader
    }

    /// The write half, for inspecting what was sent.
    pub const fn writer(&self) -> &W {
        &self.writer
    }

    /// Instructions retired on this connection, across sessions.
    pub const fn retired<E: RvfiEngine>(&self, sim: &Simulator<E>) -> u64 {
        self.retired + sim.counters().total_insns
    }

    /// Serves commands until the current trace session ends.
    ///
    /// The simulator's instruction limit is checked before each command is read
    /// and counts every instruction retired on the connection.
    ///
    /// # Errors
    ///
    /// Any [`ProtocolError`] or engine fault aborts the session.
    pub fn run<E: RvfiEngine>(&mut self, sim: &mut Simulator<E>) -> Result<SessionEnd, SimError> {
        loop {
            let retired = self.retired(sim);
            if let Some(limit) = sim.inst_limit() {
                if retired >= limit {
                    info!(target: "rvfi", "instruction limit {limit} reached");
                    return Ok(SessionEnd::LimitReached { retired });
                }
            }
            let Some(command) = read_command(&mut self.reader)? else {
                debug!(target: "rvfi", "client closed the stream");
                return Ok(SessionEnd::Disconnected);
            };
            debug!(target: "rvfi", "{} command: {command:?}", command.name());
            sim.engine_mut().clear_trace();

            match command {
                Command::EndOfTrace { .. } if command.is_version_probe() => {
                    trace!(target: "rvfi", "version probe, advertising v2 support");
                    let _ = send_packet(&mut self.writer, &ExecPacketV1::capability().encode())?;
                }
                Command::EndOfTrace { .. } => {
                    sim.engine_mut().halt_trace();
                    self.send_trace(sim)?;
                    self.sessions += 1;
                    self.retired += sim.counters().total_insns;
                    return Ok(SessionEnd::EndOfTrace);
                }
                Command::Instruction { insn, .. } => {
                    sim.engine_mut().inject_instruction(insn);
                    let status = sim.step()?;
                    self.send_trace(sim)?;
                    if let StepStatus::Halted { exit_code } = status {
                        warn!(target: "rvfi", "guest exited with code {exit_code}; trace continues");
                        sim.resume();
                    }
                }
                Command::SetVersion(requested) => {
                    self.version = TraceVersion::from_wire(u64::from(requested))?;
                    info!(target: "rvfi", "sending traces in format v{}", self.version.number());
                    let mut ack = [0u8; 16];
                    ack[..8].copy_from_slice(&VERSION_ACK_MARKER);
                    ack[8..].copy_from_slice(&self.version.number().to_le_bytes());
                    send_bytes(&mut self.writer, &ack)?;
                }
                Command::Unknown(tag) => return Err(ProtocolError::UnknownCommand(tag).into()),
            }
        }
    }

    /// Serves trace sessions until the client disconnects or the instruction
    /// limit is reached, reinitializing the machine after each one.
    ///
    /// # Errors
    ///
    /// The first error from [`run`](Self::run).
    pub fn serve<E: RvfiEngine>(&mut self, sim: &mut Simulator<E>) -> Result<(), SimError> {
        loop {
            match self.run(sim)? {
                SessionEnd::Disconnected | SessionEnd::LimitReached { .. } => return Ok(()),
                end => {
                    debug!(target: "rvfi", "session {} ended: {end:?}", self.sessions);
                    sim.reinit();
                }
            }
        }
    }

    fn send_trace<E: RvfiEngine>(&mut self, sim: &Simulator<E>) -> Result<(), ProtocolError> {
        trace!(target: "rvfi", "Sending v{} trace response...", self.version.number());
        for packet in encode_trace(sim.engine().trace(), self.version) {
            let _ = send_packet(&mut self.writer, &packet)?;
        }
        Ok(())
    }
}
