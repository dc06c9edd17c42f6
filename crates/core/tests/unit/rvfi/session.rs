//! # Session Tests
//!
//! Command streams are fed from memory and the replies are decoded back into
//! packets.

use std::io::Cursor;

use pretty_assertions::assert_eq;
use rvcosim_core::common::constants::VERSION_PROBE;
use rvcosim_core::common::error::{ProtocolError, SimError};
use rvcosim_core::engine::StepOutcome;
use rvcosim_core::rvfi::packet::{
    AVAILABLE_INT_DATA, AVAILABLE_MEM_DATA, ExecPacketV1, ExecPacketV2, IntDataPacket,
    MemDataPacket, Packet,
};
use rvcosim_core::rvfi::{Command, Session, SessionEnd, TraceVersion};

use super::wire;
use crate::common::builder::InstructionBuilder;
use crate::common::engine::ScriptedEngine;
use crate::common::{RAM_BASE, cosim_platform, reference_sim, scripted_sim};

type MemSession = Session<Cursor<Vec<u8>>, Vec<u8>>;

fn session(commands: &[Command]) -> MemSession {
    Session::new(Cursor::new(wire(commands)), Vec::new())
}

fn nop(time: u16) -> Command {
    Command::Instruction {
        insn: 0x0000_0013,
        time,
    }
}

const END: Command = Command::EndOfTrace { payload: 0 };

/// Splits a V1 reply stream into execution packets.
fn v1_packets(bytes: &[u8]) -> Vec<ExecPacketV1> {
    assert_eq!(bytes.len() % 88, 0, "reply is a whole number of packets");
    bytes
        .chunks(88)
        .map(|chunk| ExecPacketV1::decode(chunk).unwrap())
        .collect()
}

#[test]
fn test_version_probe_reports_capability() {
    let mut s = session(&[Command::EndOfTrace {
        payload: VERSION_PROBE,
    }]);
    let mut sim = scripted_sim(ScriptedEngine::new(), cosim_platform());

    assert_eq!(s.run(&mut sim).unwrap(), SessionEnd::Disconnected);
    assert_eq!(v1_packets(s.writer()), vec![ExecPacketV1::capability()]);
    assert_eq!(s.sessions(), 0);
    assert_eq!(sim.counters().total_insns, 0);
}

#[test]
fn test_set_version_acknowledges() {
    let mut s = session(&[Command::SetVersion(2)]);
    let mut sim = scripted_sim(ScriptedEngine::new(), cosim_platform());

    assert_eq!(s.run(&mut sim).unwrap(), SessionEnd::Disconnected);
    assert_eq!(s.version(), TraceVersion::V2);
    let ack = s.writer();
    assert_eq!(ack.len(), 16);
    assert_eq!(&ack[..8], b"version=");
    assert_eq!(u64::from_le_bytes(ack[8..].try_into().unwrap()), 2);
}

#[test]
fn test_unsupported_version_is_fatal() {
    let mut s = session(&[Command::SetVersion(3), nop(0)]);
    let mut sim = scripted_sim(ScriptedEngine::new(), cosim_platform());

    assert!(matches!(
        s.run(&mut sim),
        Err(SimError::Protocol(ProtocolError::UnsupportedVersion(3)))
    ));
    assert!(s.writer().is_empty());
    assert_eq!(s.version(), TraceVersion::V1);
}

#[test]
fn test_v1_trace_session() {
    let mut s = session(&[nop(7), END]);
    let mut sim = scripted_sim(ScriptedEngine::new(), cosim_platform());

    assert_eq!(s.run(&mut sim).unwrap(), SessionEnd::EndOfTrace);
    assert_eq!(s.sessions(), 1);

    let packets = v1_packets(s.writer());
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0].insn, 0x13);
    assert_eq!(packets[0].order, 0);
    assert_eq!(packets[0].halt, 0);
    assert_eq!(
        packets[1],
        ExecPacketV1 {
            halt: 1,
            ..ExecPacketV1::default()
        }
    );
    assert_eq!(sim.engine().injected, vec![0x13]);
}

#[test]
fn test_v2_trace_session_with_reference_engine() {
    let addi = InstructionBuilder::new().addi(1, 0, 5).build();
    let auipc = InstructionBuilder::new().auipc(2, 0).build();
    let sw = InstructionBuilder::new().sw(2, 1, 0x100).build();
    let mut s = session(&[
        Command::SetVersion(2),
        Command::Instruction { insn: addi, time: 0 },
        Command::Instruction { insn: auipc, time: 1 },
        Command::Instruction { insn: sw, time: 2 },
        END,
    ]);
    let mut sim = reference_sim(&[], cosim_platform());

    assert_eq!(s.run(&mut sim).unwrap(), SessionEnd::EndOfTrace);
    let out = &s.writer()[16..];

    // addi: execution packet plus integer data.
    let exec = ExecPacketV2::decode(&out[..64]).unwrap();
    assert_eq!((exec.order, exec.insn), (0, u64::from(addi)));
    assert_eq!(exec.trace_size, 104);
    assert_eq!(exec.available_fields, AVAILABLE_INT_DATA);
    assert_eq!((exec.valid, exec.mode, exec.ixl), (1, 3, 2));
    assert_eq!((exec.pc_rdata, exec.pc_wdata), (RAM_BASE, RAM_BASE + 4));
    let int = IntDataPacket::decode(&out[64..104]).unwrap().0;
    assert_eq!((int.rd_addr, int.rd_wdata), (1, 5));
    let out = &out[104..];

    // auipc: execution packet plus integer data.
    let exec = ExecPacketV2::decode(&out[..64]).unwrap();
    assert_eq!(exec.order, 1);
    let int = IntDataPacket::decode(&out[64..104]).unwrap().0;
    assert_eq!((int.rd_addr, int.rd_wdata), (2, RAM_BASE + 4));
    let out = &out[104..];

    // sw: no register written, one memory write.
    let exec = ExecPacketV2::decode(&out[..64]).unwrap();
    assert_eq!(exec.order, 2);
    assert_eq!(exec.trace_size, 152);
    assert_eq!(exec.available_fields, AVAILABLE_MEM_DATA);
    let mem = MemDataPacket::decode(&out[64..152]).unwrap().0;
    assert_eq!(mem.addr, RAM_BASE + 4 + 0x100);
    assert_eq!(mem.wdata[0], 5);
    assert_eq!(mem.wmask, 0xF);
    let out = &out[152..];

    // EndOfTrace: a bare halted record.
    assert_eq!(out.len(), 64);
    let end = ExecPacketV2::decode(out).unwrap();
    assert_eq!(end.halt, 1);
    assert_eq!(end.valid, 0);
    assert_eq!(end.trace_size, 64);
    assert_eq!(end.available_fields, 0);

    assert_eq!(sim.engine().memory().read(RAM_BASE + 0x104, 4), 5);
}

#[test]
fn test_guest_exit_keeps_session_open() {
    let engine =
        ScriptedEngine::new().with_script([StepOutcome::retired(), StepOutcome::halted(9)]);
    let mut s = session(&[nop(0), nop(1), nop(2), END]);
    let mut sim = scripted_sim(engine, cosim_platform());

    assert_eq!(s.run(&mut sim).unwrap(), SessionEnd::EndOfTrace);
    assert_eq!(s.sessions(), 1);
    assert_eq!(sim.engine().inits, 1);
    assert_eq!(sim.engine().injected.len(), 3);

    let orders: Vec<(u64, u8)> = v1_packets(s.writer())
        .iter()
        .map(|packet| (packet.order, packet.halt))
        .collect();
    assert_eq!(orders, vec![(0, 0), (1, 0), (2, 0), (0, 1)]);
}

#[test]
fn test_end_of_trace_stops_reading() {
    let mut s = session(&[nop(0), END, nop(1)]);
    let mut sim = scripted_sim(ScriptedEngine::new(), cosim_platform());

    assert_eq!(s.run(&mut sim).unwrap(), SessionEnd::EndOfTrace);
    assert_eq!(s.reader().position(), 16);
    assert_eq!(v1_packets(s.writer()).len(), 2);
    assert_eq!(sim.engine().injected.len(), 1);
}

#[test]
fn test_instruction_limit_stops_session() {
    let mut s = session(&[nop(0), nop(1), nop(2), END]);
    let mut sim =
        scripted_sim(ScriptedEngine::new(), cosim_platform()).with_inst_limit(Some(2));

    assert_eq!(
        s.run(&mut sim).unwrap(),
        SessionEnd::LimitReached { retired: 2 }
    );
    assert_eq!(s.reader().position(), 16);
    assert_eq!(v1_packets(s.writer()).len(), 2);
    assert_eq!(s.sessions(), 0);
}

#[test]
fn test_instruction_limit_spans_sessions() {
    let mut s = session(&[nop(0), END, nop(1), nop(2), END]);
    let mut sim =
        scripted_sim(ScriptedEngine::new(), cosim_platform()).with_inst_limit(Some(2));

    s.serve(&mut sim).unwrap();
    assert_eq!(s.sessions(), 1);
    assert_eq!(s.retired(&sim), 2);
    assert_eq!(s.reader().position(), 24);
    assert_eq!(sim.engine().injected.len(), 2);
    assert_eq!(v1_packets(s.writer()).len(), 3);
}

#[test]
fn test_unknown_command_is_fatal() {
    let mut s = session(&[nop(0), Command::Unknown(0x7F)]);
    let mut sim = scripted_sim(ScriptedEngine::new(), cosim_platform());

    assert!(matches!(
        s.run(&mut sim),
        Err(SimError::Protocol(ProtocolError::UnknownCommand(0x7F)))
    ));
    assert_eq!(v1_packets(s.writer()).len(), 1);
}

#[test]
fn test_truncated_command_is_fatal() {
    let mut s = Session::new(Cursor::new(vec![0x13, 0, 0, 0, 0]), Vec::new());
    let mut sim = scripted_sim(ScriptedEngine::new(), cosim_platform());

    assert!(matches!(
        s.run(&mut sim),
        Err(SimError::Protocol(ProtocolError::TruncatedCommand(5)))
    ));
}

#[test]
fn test_engine_fault_aborts_session() {
    let engine = ScriptedEngine::new().with_script([StepOutcome::fault("boom")]);
    let mut s = session(&[nop(0), END]);
    let mut sim = scripted_sim(engine, cosim_platform());

    assert!(matches!(s.run(&mut sim), Err(SimError::Engine(_))));
    assert!(s.writer().is_empty());
}

#[test]
fn test_serve_reinitialises_between_sessions() {
    let mut s = session(&[
        Command::SetVersion(2),
        nop(0),
        nop(1),
        END,
        nop(2),
        END,
    ]);
    let mut sim = scripted_sim(ScriptedEngine::new(), cosim_platform());

    s.serve(&mut sim).unwrap();
    assert_eq!(s.sessions(), 2);
    assert_eq!(s.version(), TraceVersion::V2);
    assert_eq!(sim.engine().inits, 3);

    // ack, two steps and an end, then one step and an end; all 64-byte records.
    let out = &s.writer()[16..];
    assert_eq!(out.len(), 5 * 64);
    let orders: Vec<(u64, u8)> = out
        .chunks(64)
        .map(|chunk| {
            let exec = ExecPacketV2::decode(chunk).unwrap();
            (exec.order, exec.halt)
        })
        .collect();
    assert_eq!(orders, vec![(0, 0), (1, 0), (0, 1), (0, 0), (0, 1)]);
}
