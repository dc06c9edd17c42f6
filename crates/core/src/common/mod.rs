//! Common utilities and types used throughout the harness.
//!
//! This module provides building blocks shared across components. It includes:
//! 1. **Error Handling:** Configuration, protocol, engine and loader error types.
//! 2. **Constants:** Reset-vector, mailbox and co-simulation protocol constants.

/// Common constants used throughout the harness.
pub mod constants;

/// Error types for every failure class.
pub mod error;

pub use error::{ConfigError, EngineFault, LoadError, ProtocolError, SimError};
