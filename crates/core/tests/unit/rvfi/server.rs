//! # Server Tests

use std::io::{Read, Write};
use std::net::TcpStream;
use std::thread;

use pretty_assertions::assert_eq;
use rvcosim_core::common::constants::VERSION_PROBE;
use rvcosim_core::rvfi::Command;
use rvcosim_core::rvfi::packet::{ExecPacketV1, Packet};
use rvcosim_core::rvfi::server::{RvfiServer, serve};

use super::wire;
use crate::common::engine::ScriptedEngine;
use crate::common::{cosim_platform, scripted_sim};

#[test]
fn test_serves_one_client_over_loopback() {
    let server = RvfiServer::bind(0).unwrap();
    let port = server.port().unwrap();

    let client = thread::spawn(move || {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let mut replies = Vec::new();
        let mut buf = [0u8; 88];

        stream
            .write_all(&wire(&[Command::EndOfTrace {
                payload: VERSION_PROBE,
            }]))
            .unwrap();
        stream.read_exact(&mut buf).unwrap();
        replies.push(ExecPacketV1::decode(&buf).unwrap());

        stream
            .write_all(&wire(&[Command::Instruction {
                insn: 0x0010_0093,
                time: 0,
            }]))
            .unwrap();
        stream.read_exact(&mut buf).unwrap();
        replies.push(ExecPacketV1::decode(&buf).unwrap());
        replies
    });

    let stream = server.accept().unwrap();
    let mut sim = scripted_sim(ScriptedEngine::new(), cosim_platform());
    serve(&stream, &mut sim).unwrap();

    let replies = client.join().unwrap();
    assert_eq!(replies[0], ExecPacketV1::capability());
    assert_eq!(replies[1].insn, 0x0010_0093);
    assert_eq!(replies[1].halt, 0);
    assert_eq!(sim.engine().injected, vec![0x0010_0093]);
}

#[test]
fn test_bind_reports_chosen_port() {
    let server = RvfiServer::bind(0).unwrap();
    assert_ne!(server.port().unwrap(), 0);
}
