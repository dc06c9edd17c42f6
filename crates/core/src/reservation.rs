//! Load-reserved/store-conditional reservation unit.
//!
//! Tracks at most one outstanding reservation for the single execution context.
//! Matching compares addresses within the active register width only: with
//! `XLEN = 32`, addresses that differ above bit 31 match.
//!
//! All operations run synchronously inside the evaluation of one instruction.
//! Matching never clears the reservation; the engine cancels it explicitly once
//! the store-conditional's outcome is known.

use tracing::trace;

use crate::config::Xlen;

/// The reservation register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    /// Reserved address as presented by the engine.
    pub address: u64,
    /// Whether the reservation is live.
    pub valid: bool,
}

/// Single-context LR/SC reservation tracking.
#[derive(Debug, Clone)]
pub struct ReservationUnit {
    xlen: Xlen,
    reservation: Reservation,
}

impl ReservationUnit {
    /// Creates an empty reservation unit for a hart of width `xlen`.
    pub const fn new(xlen: Xlen) -> Self {
        Self {
            xlen,
            reservation: Reservation {
                address: 0,
                valid: false,
            },
        }
    }

    /// Registers `addr`, replacing any earlier reservation.
    pub fn load_reservation(&mut self, addr: u64) {
        self.reservation = Reservation {
            address: addr,
            valid: true,
        };
        trace!(target: "mem", "reservation <- {addr:#018x}");
    }

    /// Whether a live reservation covers `addr` within the active register width.
    pub fn match_reservation(&self, addr: u64) -> bool {
        let mask = self.mask();
        let Reservation { address, valid } = self.reservation;
        let hit = valid && (address & mask) == (addr & mask);
        trace!(
            target: "mem",
            "reservation({}): {address:#018x}, key={addr:#018x}: {}",
            if valid { 'v' } else { 'i' },
            if hit { "ok" } else { "fail" }
        );
        hit
    }

    /// Invalidates the reservation.
    pub fn cancel_reservation(&mut self) {
        trace!(target: "mem", "reservation <- none");
        self.reservation.valid = false;
    }

    /// Whether a store-conditional may succeed on this attempt.
    ///
    /// Spurious failure is not modeled; this always succeeds.
    #[allow(clippy::unused_self)]
    pub const fn speculate_conditional(&self) -> bool {
        true
    }

    /// Address comparison mask for the active register width.
    pub const fn mask(&self) -> u64 {
        self.xlen.mask()
    }

    /// Current reservation register.
    pub const fn current(&self) -> Reservation {
        self.reservation
    }

    /// Clears all state, as on reinitialization.
    pub const fn reset(&mut self) {
        self.reservation = Reservation {
            address: 0,
            valid: false,
        };
    }
}
