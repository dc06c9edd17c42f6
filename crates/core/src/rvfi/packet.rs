//! Trace packet schemas.
//!
//! Each schema is a fixed sequence of little-endian fields, first field in the
//! least significant bits. Version 1 is a single execution packet. Version 2 is an
//! execution packet followed, in order, by an integer-data and a memory-data
//! sub-packet, each present only when the step produced that effect.

use crate::common::constants::V2_SUPPORT_MARKER;
use crate::common::error::ProtocolError;
use crate::rvfi::bits::{BitReader, BitWriter};
use crate::rvfi::frame::RawPacket;
use crate::rvfi::trace::{IntData, MemAccess, RvfiTrace};

/// Magic opening a version 2 execution packet.
pub const EXEC_V2_MAGIC: [u8; 8] = *b"trace-v2";
/// Magic opening an integer-data sub-packet.
pub const INT_DATA_MAGIC: [u8; 8] = *b"int-data";
/// Magic opening a memory-data sub-packet.
pub const MEM_DATA_MAGIC: [u8; 8] = *b"mem-data";

/// `available_fields` bit announcing an integer-data sub-packet.
pub const AVAILABLE_INT_DATA: u64 = 1 << 0;
/// `available_fields` bit announcing a memory-data sub-packet.
pub const AVAILABLE_MEM_DATA: u64 = 1 << 1;

/// Trace packet format negotiated for a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraceVersion {
    /// One flat execution packet per step.
    #[default]
    V1,
    /// Execution packet plus optional sub-packets.
    V2,
}

impl TraceVersion {
    /// Parses a version requested by the client.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::UnsupportedVersion`] for anything other than 1 or 2.
    pub const fn from_wire(version: u64) -> Result<Self, ProtocolError> {
        match version {
            1 => Ok(Self::V1),
            2 => Ok(Self::V2),
            other => Err(ProtocolError::UnsupportedVersion(other)),
        }
    }

    /// Numeric version as sent on the wire.
    pub const fn number(self) -> u64 {
        match self {
            Self::V1 => 1,
            Self::V2 => 2,
        }
    }
}

/// A fixed-layout packet schema.
pub trait Packet: Sized {
    /// Schema name used in diagnostics.
    const SCHEMA: &'static str;
    /// Packet length in bits.
    const BITS: usize;

    /// Appends every field, first field first.
    fn write_fields(&self, out: &mut BitWriter);

    /// Reads every field back; `None` means the input ran short.
    fn read_fields(input: &mut BitReader<'_>) -> Option<Self>;

    /// Leading magic, for schemas that carry one.
    fn magic() -> Option<[u8; 8]> {
        None
    }

    /// Packs the packet for framing.
    fn encode(&self) -> RawPacket {
        let mut out = BitWriter::with_capacity(Self::BITS);
        self.write_fields(&mut out);
        RawPacket::from(out)
    }

    /// Unpacks a packet received as exactly `BITS / 8` bytes.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Malformed`] on a length or magic mismatch.
    fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let expected = Self::BITS / 8;
        if bytes.len() != expected {
            return Err(malformed::<Self>(format!(
                "expected {expected} bytes, got {}",
                bytes.len()
            )));
        }
        if let Some(magic) = Self::magic() {
            if bytes[..8] != magic {
                return Err(malformed::<Self>(format!("bad magic {:02x?}", &bytes[..8])));
            }
        }
        Self::read_fields(&mut BitReader::new(bytes))
            .ok_or_else(|| malformed::<Self>("truncated field".to_owned()))
    }
}

fn malformed<P: Packet>(reason: String) -> ProtocolError {
    ProtocolError::Malformed {
        schema: P::SCHEMA,
        reason,
    }
}

/// Version 1 execution packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecPacketV1 {
    /// Retirement order.
    pub order: u64,
    /// PC of the instruction.
    pub pc_rdata: u64,
    /// PC of the next instruction.
    pub pc_wdata: u64,
    /// Instruction encoding.
    pub insn: u64,
    /// Value read from `rs1`.
    pub rs1_data: u64,
    /// Value read from `rs2`.
    pub rs2_data: u64,
    /// Value written to `rd`.
    pub rd_wdata: u64,
    /// Accessed address.
    pub mem_addr: u64,
    /// Low 64 bits read from memory.
    pub mem_rdata: u64,
    /// Low 64 bits written to memory.
    pub mem_wdata: u64,
    /// Bytes read.
    pub mem_rmask: u8,
    /// Bytes written.
    pub mem_wmask: u8,
    /// First source register.
    pub rs1_addr: u8,
    /// Second source register.
    pub rs2_addr: u8,
    /// Destination register.
    pub rd_addr: u8,
    /// Instruction trapped.
    pub trap: u8,
    /// Final packet of the trace.
    pub halt: u8,
    /// First instruction of a handler.
    pub intr: u8,
}

impl ExecPacketV1 {
    /// Flattens a trace; absent effects read as zero.
    pub fn from_trace(trace: &RvfiTrace) -> Self {
        let int = trace.int_data.unwrap_or_default();
        let mem = trace.mem_access.unwrap_or_default();
        Self {
            order: trace.order,
            pc_rdata: trace.pc_rdata,
            pc_wdata: trace.pc_wdata,
            insn: trace.insn,
            rs1_data: int.rs1_rdata,
            rs2_data: int.rs2_rdata,
            rd_wdata: int.rd_wdata,
            mem_addr: mem.addr,
            mem_rdata: mem.rdata[0],
            mem_wdata: mem.wdata[0],
            mem_rmask: mem.rmask as u8,
            mem_wmask: mem.wmask as u8,
            rs1_addr: int.rs1_addr,
            rs2_addr: int.rs2_addr,
            rd_addr: int.rd_addr,
            trap: trace.trap,
            halt: trace.halt,
            intr: trace.intr,
        }
    }

    /// Reply to the version probe: all zero except `halt`, which carries the v2 support marker.
    pub const fn capability() -> Self {
        Self {
            order: 0,
            pc_rdata: 0,
            pc_wdata: 0,
            insn: 0,
            rs1_data: 0,
            rs2_data: 0,
            rd_wdata: 0,
            mem_addr: 0,
            mem_rdata: 0,
            mem_wdata: 0,
            mem_rmask: 0,
            mem_wmask: 0,
            rs1_addr: 0,
            rs2_addr: 0,
            rd_addr: 0,
            trap: 0,
            halt: V2_SUPPORT_MARKER,
            intr: 0,
        }
    }
}

impl Packet for ExecPacketV1 {
    const SCHEMA: &'static str = "exec-v1";
    const BITS: usize = 704;

    fn write_fields(&self, out: &mut BitWriter) {
        for word in [
            self.order,
            self.pc_rdata,
            self.pc_wdata,
            self.insn,
            self.rs1_data,
            self.rs2_data,
            self.rd_wdata,
            self.mem_addr,
            self.mem_rdata,
            self.mem_wdata,
        ] {
            out.push(word, 64);
        }
        out.push_bytes(&[
            self.mem_rmask,
            self.mem_wmask,
            self.rs1_addr,
            self.rs2_addr,
            self.rd_addr,
            self.trap,
            self.halt,
            self.intr,
        ]);
    }

    fn read_fields(input: &mut BitReader<'_>) -> Option<Self> {
        Some(Self {
            order: input.take(64)?,
            pc_rdata: input.take(64)?,
            pc_wdata: input.take(64)?,
            insn: input.take(64)?,
            rs1_data: input.take(64)?,
            rs2_data: input.take(64)?,
            rd_wdata: input.take(64)?,
            mem_addr: input.take(64)?,
            mem_rdata: input.take(64)?,
            mem_wdata: input.take(64)?,
            mem_rmask: input.take(8)? as u8,
            mem_wmask: input.take(8)? as u8,
            rs1_addr: input.take(8)? as u8,
            rs2_addr: input.take(8)? as u8,
            rd_addr: input.take(8)? as u8,
            trap: input.take(8)? as u8,
            halt: input.take(8)? as u8,
            intr: input.take(8)? as u8,
        })
    }
}

/// Version 2 execution packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecPacketV2 {
    /// Bytes in this packet plus the sub-packets that follow it.
    pub trace_size: u64,
    /// Retirement order.
    pub order: u64,
    /// Instruction encoding.
    pub insn: u64,
    /// Instruction trapped.
    pub trap: u8,
    /// Final packet of the trace.
    pub halt: u8,
    /// First instruction of a handler.
    pub intr: u8,
    /// Privilege mode.
    pub mode: u8,
    /// `MXL` of the active register width.
    pub ixl: u8,
    /// Record describes an executed instruction.
    pub valid: u8,
    /// PC of the instruction.
    pub pc_rdata: u64,
    /// PC of the next instruction.
    pub pc_wdata: u64,
    /// Which sub-packets follow.
    pub available_fields: u64,
}

impl ExecPacketV2 {
    /// Execution packet for `trace`, sized for the sub-packets it announces.
    pub fn from_trace(trace: &RvfiTrace) -> Self {
        let mut available_fields = 0;
        let mut trace_size = Self::BITS / 8;
        if trace.int_data.is_some() {
            available_fields |= AVAILABLE_INT_DATA;
            trace_size += IntDataPacket::BITS / 8;
        }
        if trace.mem_access.is_some() {
            available_fields |= AVAILABLE_MEM_DATA;
            trace_size += MemDataPacket::BITS / 8;
        }
        Self {
            trace_size: trace_size as u64,
            order: trace.order,
            insn: trace.insn,
            trap: trace.trap,
            halt: trace.halt,
            intr: trace.intr,
            mode: trace.mode,
            ixl: trace.ixl,
            valid: trace.valid,
            pc_rdata: trace.pc_rdata,
            pc_wdata: trace.pc_wdata,
            available_fields,
        }
    }
}

impl Packet for ExecPacketV2 {
    const SCHEMA: &'static str = "exec-v2";
    const BITS: usize = 512;

    fn magic() -> Option<[u8; 8]> {
        Some(EXEC_V2_MAGIC)
    }

    fn write_fields(&self, out: &mut BitWriter) {
        out.push_bytes(&EXEC_V2_MAGIC);
        out.push(self.trace_size, 64);
        out.push(self.order, 64);
        out.push(self.insn, 64);
        out.push_bytes(&[self.trap, self.halt, self.intr, self.mode, self.ixl, self.valid]);
        out.pad(16);
        out.push(self.pc_rdata, 64);
        out.push(self.pc_wdata, 64);
        out.push(self.available_fields, 64);
    }

    fn read_fields(input: &mut BitReader<'_>) -> Option<Self> {
        input.skip(64)?;
        let trace_size = input.take(64)?;
        let order = input.take(64)?;
        let insn = input.take(64)?;
        let [trap, halt, intr, mode, ixl, valid] = input.take_bytes::<6>()?;
        input.skip(16)?;
        Some(Self {
            trace_size,
            order,
            insn,
            trap,
            halt,
            intr,
            mode,
            ixl,
            valid,
            pc_rdata: input.take(64)?,
            pc_wdata: input.take(64)?,
            available_fields: input.take(64)?,
        })
    }
}

/// Integer-data sub-packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntDataPacket(pub IntData);

impl Packet for IntDataPacket {
    const SCHEMA: &'static str = "int-data";
    const BITS: usize = 320;

    fn magic() -> Option<[u8; 8]> {
        Some(INT_DATA_MAGIC)
    }

    fn write_fields(&self, out: &mut BitWriter) {
        let data = &self.0;
        out.push_bytes(&INT_DATA_MAGIC);
        out.push(data.rd_wdata, 64);
        out.push(data.rs1_rdata, 64);
        out.push(data.rs2_rdata, 64);
        out.push_bytes(&[data.rd_addr, data.rs1_addr, data.rs2_addr]);
        out.pad(40);
    }

    fn read_fields(input: &mut BitReader<'_>) -> Option<Self> {
        input.skip(64)?;
        let rd_wdata = input.take(64)?;
        let rs1_rdata = input.take(64)?;
        let rs2_rdata = input.take(64)?;
        let [rd_addr, rs1_addr, rs2_addr] = input.take_bytes::<3>()?;
        Some(Self(IntData {
            rd_wdata,
            rs1_rdata,
            rs2_rdata,
            rd_addr,
            rs1_addr,
            rs2_addr,
        }))
    }
}

/// Memory-data sub-packet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemDataPacket(pub MemAccess);

impl Packet for MemDataPacket {
    const SCHEMA: &'static str = "mem-data";
    const BITS: usize = 704;

    fn magic() -> Option<[u8; 8]> {
        Some(MEM_DATA_MAGIC)
    }

    fn write_fields(&self, out: &mut BitWriter) {
        let mem = &self.0;
        out.push_bytes(&MEM_DATA_MAGIC);
        for limb in mem.rdata.iter().chain(&mem.wdata) {
            out.push(*limb, 64);
        }
        out.push(u64::from(mem.rmask), 32);
        out.push(u64::from(mem.wmask), 32);
        out.push(mem.addr, 64);
    }

    fn read_fields(input: &mut BitReader<'_>) -> Option<Self> {
        input.skip(64)?;
        let mut rdata = [0; 4];
        for limb in &mut rdata {
            *limb = input.take(64)?;
        }
        let mut wdata = [0; 4];
        for limb in &mut wdata {
            *limb = input.take(64)?;
        }
        Some(Self(MemAccess {
            rmask: input.take(32)? as u32,
            wmask: input.take(32)? as u32,
            addr: input.take(64)?,
            rdata,
            wdata,
        }))
    }
}

/// Packets answering one step, in wire order.
pub fn encode_trace(trace: &RvfiTrace, version: TraceVersion) -> Vec<RawPacket> {
    match version {
        TraceVersion::V1 => vec![ExecPacketV1::from_trace(trace).encode()],
        TraceVersion::V2 => {
            let mut packets = vec![ExecPacketV2::from_trace(trace).encode()];
            if let Some(int) = trace.int_data {
                packets.push(IntDataPacket(int).encode());
            }
            if let Some(mem) = trace.mem_access {
                packets.push(MemDataPacket(mem).encode());
            }
            packets
        }
    }
}
