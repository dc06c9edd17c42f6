//! # Framing Tests

use std::io::{self, Cursor, Read};

use mockall::mock;
use pretty_assertions::assert_eq;
use rvcosim_core::common::error::ProtocolError;
use rvcosim_core::rvfi::frame::{read_command, send_bytes, send_packet};
use rvcosim_core::rvfi::{Command, RawPacket};

mock! {
    pub Sink {}
    impl io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
        fn flush(&mut self) -> io::Result<()>;
    }
}

#[test]
fn test_to_wire_pads_missing_bytes() {
    let packet = RawPacket::new(32, vec![0xAB]);
    assert_eq!(packet.to_wire().unwrap(), vec![0xAB, 0, 0, 0]);
}

#[test]
fn test_to_wire_drops_bytes_beyond_length() {
    let packet = RawPacket::new(16, vec![1, 2, 3, 4]);
    assert_eq!(packet.to_wire().unwrap(), vec![1, 2]);
}

#[test]
fn test_misaligned_packet_is_rejected() {
    let packet = RawPacket::new(63, vec![0; 8]);
    assert!(matches!(
        packet.to_wire(),
        Err(ProtocolError::MisalignedPacket { bits: 63 })
    ));
}

#[test]
fn test_size_limit_is_inclusive() {
    assert_eq!(RawPacket::new(4096 * 8, Vec::new()).to_wire().unwrap().len(), 4096);
    assert!(matches!(
        RawPacket::new(4097 * 8, Vec::new()).to_wire(),
        Err(ProtocolError::OversizedPacket { bytes: 4097 })
    ));
}

#[test]
fn test_send_packet_writes_once() {
    let mut out = Vec::new();
    let sent = send_packet(&mut out, &RawPacket::new(24, vec![7, 8, 9])).unwrap();
    assert_eq!(sent, 3);
    assert_eq!(out, vec![7, 8, 9]);

    send_bytes(&mut out, b"xy").unwrap();
    assert_eq!(out, vec![7, 8, 9, b'x', b'y']);
}

#[test]
fn test_short_write_is_fatal() {
    let mut sink = MockSink::new();
    let _ = sink.expect_write().times(1).returning(|buf| Ok(buf.len() - 1));

    match send_packet(&mut sink, &RawPacket::new(64, vec![0; 8])) {
        Err(ProtocolError::ShortWrite { expected, written }) => {
            assert_eq!((expected, written), (8, 7));
        }
        other => panic!("expected short write, got {other:?}"),
    }
}

#[test]
fn test_write_error_is_reported() {
    let mut sink = MockSink::new();
    let _ = sink
        .expect_write()
        .times(1)
        .returning(|_| Err(io::Error::from(io::ErrorKind::BrokenPipe)));

    assert!(matches!(
        send_packet(&mut sink, &RawPacket::new(8, vec![1])),
        Err(ProtocolError::Io(_))
    ));
}

#[test]
fn test_framing_error_writes_nothing() {
    let mut sink = MockSink::new();
    let _ = sink.expect_write().never();
    assert!(send_packet(&mut sink, &RawPacket::new(12, vec![0; 2])).is_err());
}

#[test]
fn test_read_command_clean_eof() {
    let mut input = Cursor::new(Vec::new());
    assert!(read_command(&mut input).unwrap().is_none());
}

#[test]
fn test_read_command_sequence() {
    let mut bytes = vec![0x13, 0, 0, 0, 0, 0, 1, 0];
    bytes.extend([0, 0, 0, 0, 0, 0, 0, 0]);
    let mut input = Cursor::new(bytes);

    assert_eq!(
        read_command(&mut input).unwrap(),
        Some(Command::Instruction { insn: 0x13, time: 0 })
    );
    assert_eq!(
        read_command(&mut input).unwrap(),
        Some(Command::EndOfTrace { payload: 0 })
    );
    assert_eq!(read_command(&mut input).unwrap(), None);
}

#[test]
fn test_read_command_truncated_record() {
    let mut input = Cursor::new(vec![0x13, 0, 0]);
    assert!(matches!(
        read_command(&mut input),
        Err(ProtocolError::TruncatedCommand(3))
    ));
}

/// Delivers one byte per read and interrupts every other call.
struct Trickle {
    bytes: Vec<u8>,
    pos: usize,
    interrupt: bool,
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.interrupt = !self.interrupt;
        if self.interrupt {
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        if self.pos == self.bytes.len() || buf.is_empty() {
            return Ok(0);
        }
        buf[0] = self.bytes[self.pos];
        self.pos += 1;
        Ok(1)
    }
}

#[test]
fn test_read_command_reassembles_partial_reads() {
    let mut input = Trickle {
        bytes: vec![0x93, 0x00, 0x50, 0x00, 0, 0, 1, 0],
        pos: 0,
        interrupt: false,
    };
    assert_eq!(
        read_command(&mut input).unwrap(),
        Some(Command::Instruction {
            insn: 0x0050_0093,
            time: 0
        })
    );
    assert_eq!(read_command(&mut input).unwrap(), None);
}
