//! Simulator: owns the engine and every piece of harness state side-by-side.
//!
//! All mutable state (reservation, counters, tick countdown, loop state) lives in
//! one value passed by exclusive ownership, so independent simulators can run in
//! the same process. The loop moves through `Init -> Running -> {Halted | Faulted}`;
//! both terminal states reject further steps until [`Simulator::reinit`].

use tracing::{debug, error, info, trace};

use crate::common::error::{EngineFault, SimError};
use crate::engine::{Engine, StepEnv};
use crate::platform::Platform;
use crate::reservation::ReservationUnit;
use crate::sim::bootstrap::BootImage;
use crate::stats::{ExecutionCounters, RunTimes, TimeReport};
use crate::tick::TickScheduler;

/// Execution loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Platform and memory image established; nothing stepped yet.
    Init,
    /// At least one step requested.
    Running,
    /// The guest signalled completion.
    Halted {
        /// Guest-supplied exit code; zero is success.
        exit_code: u64,
    },
    /// The engine reported an internal exception.
    Faulted,
}

impl LoopState {
    /// Whether the loop has stopped for good.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Halted { .. } | Self::Faulted)
    }
}

/// Result of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Execution continues.
    Continue,
    /// The guest halted on this step.
    Halted {
        /// Guest-supplied exit code.
        exit_code: u64,
    },
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The guest halted.
    Halted {
        /// Guest-supplied exit code; zero is success.
        exit_code: u64,
    },
    /// The instruction limit stopped the run; success is not evaluated.
    LimitReached {
        /// Instructions retired when the limit was hit.
        retired: u64,
    },
}

/// The execution loop.
#[derive(Debug)]
pub struct Simulator<E: Engine> {
    engine: E,
    platform: Platform,
    reservation: ReservationUnit,
    counters: ExecutionCounters,
    ticks: TickScheduler,
    boot: BootImage,
    state: LoopState,
    inst_limit: Option<u64>,
    times: Option<RunTimes>,
}

impl<E: Engine> Simulator<E> {
    /// Initializes `engine` for `platform` and installs the boot image.
    pub fn new(mut engine: E, platform: Platform, boot: BootImage) -> Self {
        engine.init(&platform);
        boot.apply(&mut engine);
        debug!(target: "platform", "boot pc {:#x}", boot.start_pc());
        Self {
            reservation: ReservationUnit::new(platform.xlen()),
            ticks: TickScheduler::new(platform.insns_per_tick()),
            engine,
            platform,
            counters: ExecutionCounters::default(),
            boot,
            state: LoopState::Init,
            inst_limit: None,
            times: None,
        }
    }

    /// Stops [`run`](Self::run) once `limit` instructions have retired.
    #[must_use]
    pub const fn with_inst_limit(mut self, limit: Option<u64>) -> Self {
        self.inst_limit = limit;
        self
    }

    /// Records run timing; `times` should have been started before loading.
    #[must_use]
    pub fn with_timing(mut self, times: RunTimes) -> Self {
        self.times = Some(times);
        self
    }

    /// Executes one instruction.
    ///
    /// # Errors
    ///
    /// [`SimError::Terminated`] once the loop has halted or faulted, and
    /// [`SimError::Engine`] when the engine reports an internal exception.
    pub fn step(&mut self) -> Result<StepStatus, SimError> {
        match self.state {
            LoopState::Halted { .. } | LoopState::Faulted => return Err(SimError::Terminated),
            LoopState::Init => {
                self.state = LoopState::Running;
                if let Some(times) = self.times.as_mut() {
                    times.init_done();
                }
            }
            LoopState::Running => {}
        }

        let step_index = self.counters.step_index;
        let outcome = {
            let mut env = StepEnv {
                platform: &self.platform,
                reservation: &mut self.reservation,
            };
            self.engine.step(step_index, &mut env)
        };

        if let Some(reason) = outcome.exception {
            error!(target: "step", "engine exception at step {step_index}: {reason}");
            self.state = LoopState::Faulted;
            self.stop_timing();
            return Err(EngineFault {
                step: step_index,
                reason,
            }
            .into());
        }

        if outcome.stepped {
            self.counters.retire();
            trace!(target: "step", "step {step_index} retired, pc {:#x}", self.engine.pc());
            if let Some(times) = self.times.as_mut() {
                if let Some(kips) = times.interval_kips(self.counters.total_insns) {
                    info!("kips: {kips}");
                }
            }
            if self.ticks.retire() {
                self.engine.tick_clock();
                self.engine.tick_platform();
                self.counters.tick();
            }
        }

        if outcome.halted {
            let exit_code = outcome.exit_code;
            debug!(target: "step", "halted at step {step_index} with exit code {exit_code}");
            self.state = LoopState::Halted { exit_code };
            self.stop_timing();
            return Ok(StepStatus::Halted { exit_code });
        }
        Ok(StepStatus::Continue)
    }

    /// Steps until the guest halts, the engine faults or the instruction limit is hit.
    ///
    /// # Errors
    ///
    /// As for [`step`](Self::step).
    pub fn run(&mut self) -> Result<RunOutcome, SimError> {
        loop {
            if let Some(limit) = self.inst_limit {
                if self.counters.total_insns >= limit {
                    info!("instruction limit {limit} reached");
                    self.stop_timing();
                    return Ok(RunOutcome::LimitReached {
                        retired: self.counters.total_insns,
                    });
                }
            }
            if let StepStatus::Halted { exit_code } = self.step()? {
                return Ok(RunOutcome::Halted { exit_code });
            }
        }
    }

    /// Returns the machine to its initial conditions.
    ///
    /// Engine state, memory, reservation, counters and tick countdown are all reset
    /// and the boot image is installed again.
    pub fn reinit(&mut self) {
        self.engine.fini();
        self.engine.init(&self.platform);
        self.boot.apply(&mut self.engine);
        self.reservation.reset();
        self.counters.reset();
        self.ticks.reset();
        self.state = LoopState::Init;
        debug!(target: "platform", "machine reinitialized");
    }

    /// Lets a halted loop take further steps.
    ///
    /// Used when a co-simulation client, not the guest, decides where a trace ends.
    pub const fn resume(&mut self) {
        if matches!(self.state, LoopState::Halted { .. }) {
            self.state = LoopState::Running;
        }
    }

    /// Releases the engine's resources and stops timing.
    pub fn finish(&mut self) {
        self.engine.fini();
        self.stop_timing();
    }

    fn stop_timing(&mut self) {
        if let Some(times) = self.times.as_mut() {
            times.run_done();
        }
    }

    /// Timing summary, when timing is enabled.
    pub fn time_report(&self) -> Option<TimeReport> {
        self.times
            .as_ref()
            .map(|times| times.report(self.counters.total_insns))
    }

    /// The engine.
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// The engine, mutably.
    pub const fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Consumes the simulator and returns the engine.
    pub fn into_engine(self) -> E {
        self.engine
    }

    /// The frozen platform.
    pub const fn platform(&self) -> &Platform {
        &self.platform
    }

    /// The reservation unit.
    pub const fn reservation(&self) -> &ReservationUnit {
        &self.reservation
    }

    /// Retired-instruction counters.
    pub const fn counters(&self) -> &ExecutionCounters {
        &self.counters
    }

    /// The tick scheduler.
    pub const fn ticks(&self) -> &TickScheduler {
        &self.ticks
    }

    /// Instruction limit applied by [`run`](Self::run), if any.
    pub const fn inst_limit(&self) -> Option<u64> {
        self.inst_limit
    }

    /// Current loop state.
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// The boot image reinstalled by [`reinit`](Self::reinit).
    pub const fn boot(&self) -> &BootImage {
        &self.boot
    }
}
