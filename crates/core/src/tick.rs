//! Tick scheduler.
//!
//! Converts retired instructions into coarse clock and platform ticks. A tick is due
//! after every `N` retired instructions; wall-clock time plays no part, so replay
//! with identical inputs produces identical tick points.

use std::num::NonZeroU64;

/// Countdown from `insns_per_tick` to the next tick.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    insns_per_tick: NonZeroU64,
    remaining: u64,
    ticks: u64,
}

impl TickScheduler {
    /// Creates a scheduler firing once every `insns_per_tick` retired instructions.
    pub const fn new(insns_per_tick: NonZeroU64) -> Self {
        Self {
            insns_per_tick,
            remaining: insns_per_tick.get(),
            ticks: 0,
        }
    }

    /// Records one retired instruction; returns `true` when a tick is due.
    ///
    /// The caller delivers the clock tick followed by the platform tick.
    pub const fn retire(&mut self) -> bool {
        self.remaining -= 1;
        if self.remaining == 0 {
            self.remaining = self.insns_per_tick.get();
            self.ticks += 1;
            true
        } else {
            false
        }
    }

    /// Instructions left before the next tick.
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Configured tick interval.
    pub const fn insns_per_tick(&self) -> NonZeroU64 {
        self.insns_per_tick
    }

    /// Ticks fired since creation or the last reset.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Restarts the countdown.
    pub const fn reset(&mut self) {
        self.remaining = self.insns_per_tick.get();
        self.ticks = 0;
    }
}
