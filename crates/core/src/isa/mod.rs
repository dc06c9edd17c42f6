//! Instruction Set Architecture (ISA) Definitions.
//!
//! Encoding helpers shared by the bootstrap code and the reference engine:
//!
//! * `instruction`: Field extraction from 32-bit encodings.
//! * `decode`: Immediate reconstruction for every base format.
//! * `opcodes`: Major opcodes and function codes for RV32/64 I, M, A and Zicsr.
//! * `cause`: Synchronous trap causes and their `mcause`/`mtval` values.
//! * `abi`: ABI register names used in trace output.

/// ABI register names.
pub mod abi;

/// Synchronous exception causes.
pub mod cause;

/// Instruction decoding for the R, I, S, B, U and J formats.
pub mod decode;

/// Instruction field extraction.
pub mod instruction;

/// Opcodes and function codes.
pub mod opcodes;
