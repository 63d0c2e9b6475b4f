//! Sampler control loop.
//!
//! ```text
//!  ┌──────┐  init()   ┌──────────┐  run flag set  ┌─────────┐  complete()  ┌────────┐
//!  │ Init ├──────────►│ Sampling ├───────────────►│ Halting ├─────────────►│ Halted │
//!  └──────┘           └────┬─────┘                └─────────┘              └────────┘
//!                          │ ▲
//!                          └─┘ poll → publish → dead-time
//! ```
//!
//! The run flag is checked once per iteration, before the poll, so the worst
//! case halt latency is one dead-time plus one poll. `Halted` is terminal:
//! [`LimitSampler::complete`] consumes the sampler, so nothing can write to
//! the shared map afterwards.

use crate::clock::{self, ClockStamp};
use crate::delay::DebounceDelay;
use crate::hw::{Delay, HardwareTimer, Halt, InputPort, SignalLine};
use crate::input::InputSampler;
use crate::writer::DoubleBufferWriter;
use lsw_common::consts::{COMPLETION_SIGNAL, DEFAULT_CLOCK_HZ, DEFAULT_DEBOUNCE_MS};
use lsw_common::{LimitPacket, LineMask, LswConfig, SharedMemoryMap};
use std::time::Duration;
use tracing::{debug, info};

/// Fixed sampler parameters, resolved before the loop starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerSettings {
    /// Monitored lines.
    pub line_mask: LineMask,
    /// Dead-time after each publish.
    pub debounce: DebounceDelay,
    /// Pattern driven onto the signal line at halt.
    pub completion_pattern: u32,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            line_mask: LineMask::ACTUATOR_LIMITS,
            debounce: DebounceDelay::from_duration(
                Duration::from_millis(DEFAULT_DEBOUNCE_MS),
                DEFAULT_CLOCK_HZ,
            ),
            completion_pattern: COMPLETION_SIGNAL,
        }
    }
}

impl SamplerSettings {
    /// Resolve line mask and dead-time from a validated configuration.
    pub fn from_config(config: &LswConfig) -> Self {
        Self {
            line_mask: config.line_mask(),
            debounce: DebounceDelay::from_duration(
                config.timing.debounce(),
                config.timing.clock_hz,
            ),
            completion_pattern: COMPLETION_SIGNAL,
        }
    }
}

/// The hardware seams a sampler drives.
pub struct Board<T, I, S, D> {
    /// Free-running counter.
    pub timer: T,
    /// Input register.
    pub inputs: I,
    /// Completion signal line.
    pub signal: S,
    /// Dead-time busy-wait.
    pub delay: D,
}

/// Control loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerState {
    /// Not yet initialised.
    Init,
    /// Polling and publishing.
    Sampling,
    /// Run flag observed; completion signal not yet asserted.
    Halting,
    /// Completion signal asserted. Terminal.
    Halted,
}

/// Outcome of one loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// No monitored line asserted.
    Idle,
    /// A packet was published and the dead-time elapsed.
    Published {
        /// Readiness value written (1 or 2).
        ready: u32,
        /// Published packet.
        packet: LimitPacket,
    },
    /// The run flag is set; the loop must halt.
    StopRequested,
}

/// Summary returned once the completion signal has been asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HaltReport {
    /// Packets published.
    pub published: u64,
    /// Loop iterations that polled the inputs.
    pub polls: u64,
    /// Pattern asserted on the signal line.
    pub completion_pattern: u32,
}

/// The limit-switch sampler.
pub struct LimitSampler<'m, T, I, S, D> {
    map: &'m SharedMemoryMap,
    board: Board<T, I, S, D>,
    input: InputSampler,
    writer: DoubleBufferWriter<'m>,
    settings: SamplerSettings,
    state: SamplerState,
    polls: u64,
}

impl<'m, T, I, S, D> LimitSampler<'m, T, I, S, D>
where
    T: HardwareTimer,
    I: InputPort,
    S: SignalLine,
    D: Delay,
{
    /// Build a sampler in the `Init` state.
    pub fn new(map: &'m SharedMemoryMap, board: Board<T, I, S, D>, settings: SamplerSettings) -> Self {
        Self {
            map,
            board,
            input: InputSampler::new(settings.line_mask),
            writer: DoubleBufferWriter::new(map),
            settings,
            state: SamplerState::Init,
            polls: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> SamplerState {
        self.state
    }

    /// Packets published so far.
    pub fn published(&self) -> u64 {
        self.writer.published()
    }

    /// INIT: clear readiness, stamp both headers, configure the timer.
    pub fn init(&mut self) {
        self.writer.init();
        self.board.timer.configure();
        self.state = SamplerState::Sampling;
        info!(
            "Sampler initialised: lines={:#010x}, dead-time={} cycles",
            self.settings.line_mask.bits(),
            self.settings.debounce.cycles()
        );
    }

    /// One SAMPLING iteration: check the run flag, poll, publish on
    /// assertion, then wait out the dead-time.
    pub fn step(&mut self) -> Step {
        match self.state {
            SamplerState::Init => self.init(),
            SamplerState::Sampling => {}
            SamplerState::Halting | SamplerState::Halted => return Step::StopRequested,
        }

        if self.map.stop_requested() {
            debug!("Run flag set after {} polls", self.polls);
            self.state = SamplerState::Halting;
            return Step::StopRequested;
        }

        self.polls += 1;
        let Some(lines) = self.input.poll(&mut self.board.inputs) else {
            return Step::Idle;
        };

        let stamp: ClockStamp = clock::capture(&self.board.timer, self.map);
        let packet = LimitPacket::new(stamp.raw, stamp.overflow, lines);
        let ready = self.writer.publish(&packet);
        self.board.delay.delay_cycles(self.settings.debounce.cycles());

        Step::Published { ready, packet }
    }

    /// HALTING: assert the completion pattern once. Consumes the sampler.
    pub fn complete(mut self) -> HaltReport {
        self.state = SamplerState::Halting;
        self.board
            .signal
            .assert_pattern(self.settings.completion_pattern);
        self.state = SamplerState::Halted;

        let report = HaltReport {
            published: self.writer.published(),
            polls: self.polls,
            completion_pattern: self.settings.completion_pattern,
        };
        info!(
            "Sampler halted: {} packets published over {} polls",
            report.published, report.polls
        );
        report
    }

    /// Run INIT and SAMPLING until the run flag is set, then HALTING.
    pub fn run(mut self) -> HaltReport {
        if self.state == SamplerState::Init {
            self.init();
        }
        while self.step() != Step::StopRequested {}
        self.complete()
    }
}

/// Run the sampler to completion, then stop the processor for good.
pub fn run_and_halt<T, I, S, D, H>(sampler: LimitSampler<'_, T, I, S, D>, cpu: H) -> !
where
    T: HardwareTimer,
    I: InputPort,
    S: SignalLine,
    D: Delay,
    H: Halt,
{
    let _report = sampler.run();
    cpu.halt()
}
