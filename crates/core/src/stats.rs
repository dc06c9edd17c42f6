//! Execution counters and run timing.
//!
//! This module tracks what the execution loop needs to report. It provides:
//! 1. **Counters:** Total retired instructions, per-tick retired count and the step index.
//! 2. **Timing:** Initialization and execution durations with derived Kips.
//! 3. **Throughput:** Periodic Kips samples over fixed instruction intervals.

use std::fmt;
use std::time::{Duration, Instant};

use crate::common::constants::KIPS_REPORT_INTERVAL;

/// Retired-instruction counters. Monotonic within a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionCounters {
    /// Instructions retired since the session began.
    pub total_insns: u64,
    /// Instructions retired since the last tick.
    pub tick_insns: u64,
    /// Index passed to the next engine step.
    pub step_index: u64,
}

impl ExecutionCounters {
    /// Records one retired instruction.
    pub const fn retire(&mut self) {
        self.step_index += 1;
        self.tick_insns += 1;
        self.total_insns += 1;
    }

    /// Notes that a tick was delivered.
    pub const fn tick(&mut self) {
        self.tick_insns = 0;
    }

    /// Zeroes every counter.
    pub const fn reset(&mut self) {
        *self = Self {
            total_insns: 0,
            tick_insns: 0,
            step_index: 0,
        };
    }
}

/// Wall-clock timing of a run, used for `--show-times` reporting.
#[derive(Debug, Clone)]
pub struct RunTimes {
    init_start: Instant,
    init_end: Option<Instant>,
    run_end: Option<Instant>,
    interval_start: Instant,
}

impl RunTimes {
    /// Starts timing initialization.
    pub fn start() -> Self {
        let now = Instant::now();
        Self {
            init_start: now,
            init_end: None,
            run_end: None,
            interval_start: now,
        }
    }

    /// Marks the end of initialization and the start of execution.
    pub fn init_done(&mut self) {
        let now = Instant::now();
        self.init_end = Some(now);
        self.interval_start = now;
    }

    /// Marks the end of execution.
    pub fn run_done(&mut self) {
        self.run_end = Some(Instant::now());
    }

    /// Returns a Kips sample when `total_insns` completes a reporting interval.
    pub fn interval_kips(&mut self, total_insns: u64) -> Option<u64> {
        if total_insns == 0 || total_insns % KIPS_REPORT_INTERVAL != 0 {
            return None;
        }
        let now = Instant::now();
        let elapsed = now.duration_since(self.interval_start);
        self.interval_start = now;
        let micros = elapsed.as_micros().max(1) as u64;
        Some(1000 * KIPS_REPORT_INTERVAL / micros)
    }

    /// Builds the final report.
    pub fn report(&self, total_insns: u64) -> TimeReport {
        let init_end = self.init_end.unwrap_or(self.init_start);
        let run_end = self.run_end.unwrap_or_else(Instant::now);
        TimeReport {
            init: init_end.duration_since(self.init_start),
            exec: run_end.duration_since(init_end),
            instructions: total_insns,
        }
    }
}

/// Summary printed at the end of a timed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeReport {
    /// Time spent before the first step.
    pub init: Duration,
    /// Time spent stepping.
    pub exec: Duration,
    /// Instructions retired.
    pub instructions: u64,
}

impl TimeReport {
    /// Thousands of instructions per second of execution time.
    pub fn kips(&self) -> f64 {
        let ms = self.exec.as_millis().max(1) as f64;
        self.instructions as f64 / ms
    }
}

impl fmt::Display for TimeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Initialization:   {} msecs", self.init.as_millis())?;
        writeln!(f, "Execution:        {} msecs", self.exec.as_millis())?;
        writeln!(f, "Instructions:     {}", self.instructions)?;
        write!(f, "Perf:             {:.3} Kips", self.kips())
    }
}
