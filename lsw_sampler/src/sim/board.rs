//! Simulated co-processor board.

use super::relay::OverflowRelay;
use crate::control::Board;
use crate::hw::{Delay, HardwareTimer, InputPort, SignalLine};
use crate::iep::GlobalConfig;
use lsw_common::{LineMask, LswConfig, SharedMemoryMap};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

const NO_STOP: u64 = u64::MAX;

/// Time base of a simulated board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimClock {
    /// Time only moves when the sampler polls or waits. Deterministic.
    Virtual,
    /// Cycles derived from the host's monotonic clock at `clock_hz`.
    Wall {
        /// Counter rate.
        clock_hz: u64,
    },
}

/// A scripted line assertion, in counter cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse {
    /// First cycle the lines read asserted.
    pub start: u64,
    /// Number of cycles they stay asserted.
    pub duration: u64,
    /// Asserted lines.
    pub lines: LineMask,
}

impl Pulse {
    /// Lines asserted from `start` for `duration` cycles.
    pub const fn new(start: u64, duration: u64, lines: LineMask) -> Self {
        Self {
            start,
            duration,
            lines,
        }
    }

    #[inline]
    fn active_at(&self, now: u64) -> bool {
        now >= self.start && now - self.start < self.duration
    }
}

/// One completion signal seen on the output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalEvent {
    /// Asserted pattern.
    pub pattern: u32,
    /// Board time when it was asserted.
    pub cycle: u64,
}

/// Simulated counter, inputs, output line and sibling, over one shared map.
///
/// The counter reads `start_count + elapsed cycles` modulo 2^32. Its
/// overflow flag is set from the wrap until the sibling relay clears it.
/// In [`SimClock::Virtual`] mode the relay runs whenever time advances; in
/// [`SimClock::Wall`] mode something must call
/// [`service_sibling`](Self::service_sibling) or
/// [`run_sibling`](Self::run_sibling).
#[derive(Debug)]
pub struct SimBoard<'m> {
    map: &'m SharedMemoryMap,
    clock: SimClock,
    origin: Instant,
    virtual_now: AtomicU64,
    start_count: u32,
    poll_cycles: u64,
    relay: OverflowRelay,
    pulses: Vec<Pulse>,
    stop_at: AtomicU64,
    timer_cfg: AtomicU32,
    compensation: AtomicU32,
    signals: Mutex<Vec<SignalEvent>>,
}

impl<'m> SimBoard<'m> {
    /// A board over `map` with the counter at zero and no scripted input.
    pub fn new(map: &'m SharedMemoryMap, clock: SimClock) -> Self {
        Self {
            map,
            clock,
            origin: Instant::now(),
            virtual_now: AtomicU64::new(0),
            start_count: 0,
            poll_cycles: 1,
            relay: OverflowRelay::new(0),
            pulses: Vec::new(),
            stop_at: AtomicU64::new(NO_STOP),
            timer_cfg: AtomicU32::new(0),
            // Compensation reads nonzero until configured.
            compensation: AtomicU32::new(u32::MAX),
            signals: Mutex::new(Vec::new()),
        }
    }

    /// A board built from the `[timing]` and `[simulation]` sections.
    pub fn from_config(map: &'m SharedMemoryMap, config: &LswConfig, clock: SimClock) -> Self {
        let hz = config.timing.clock_hz;
        let ms_to_cycles = |ms: u64| ms.saturating_mul(hz) / 1_000;
        let pulses = config.simulation.pulses.iter().map(|p| {
            Pulse::new(
                ms_to_cycles(p.at_ms),
                ms_to_cycles(p.hold_ms),
                LineMask::from_line_bits(&p.bits),
            )
        });

        let mut board = Self::new(map, clock)
            .with_start_count(config.simulation.start_count)
            .with_relay_lag(config.simulation.relay_lag_cycles)
            .with_poll_cycles(config.timing.poll_cycles);
        board.pulses.extend(pulses);
        board
    }

    /// Initial raw counter value.
    pub fn with_start_count(mut self, start_count: u32) -> Self {
        self.start_count = start_count;
        self
    }

    /// Sibling reaction time after each wrap.
    pub fn with_relay_lag(mut self, lag_cycles: u64) -> Self {
        self.relay = OverflowRelay::new(lag_cycles);
        self
    }

    /// Virtual cycles charged per input read. Zero is raised to one so an
    /// idle loop still reaches a scheduled stop.
    pub fn with_poll_cycles(mut self, cycles: u64) -> Self {
        self.poll_cycles = cycles.max(1);
        self
    }

    /// Script a line assertion.
    pub fn with_pulse(mut self, pulse: Pulse) -> Self {
        self.pulses.push(pulse);
        self
    }

    /// Elapsed board cycles.
    pub fn now(&self) -> u64 {
        match self.clock {
            SimClock::Virtual => self.virtual_now.load(Ordering::Acquire),
            SimClock::Wall { clock_hz } => {
                let cycles = self.origin.elapsed().as_nanos() * clock_hz as u128 / 1_000_000_000;
                u64::try_from(cycles).unwrap_or(u64::MAX)
            }
        }
    }

    /// Raw counter value at board time `cycle`.
    #[inline]
    pub fn count_at(&self, cycle: u64) -> u32 {
        self.start_count.wrapping_add(cycle as u32)
    }

    /// Raise the run flag once board time reaches `cycle`.
    pub fn request_stop_at(&self, cycle: u64) {
        self.stop_at.store(cycle, Ordering::Release);
        self.check_stop(self.now());
    }

    /// Count and clear every wrap the sibling has had time to notice.
    pub fn service_sibling(&self) -> u32 {
        let relayed = self.relay.service(self.map, self.start_count, self.now());
        if relayed > 0 {
            debug!(
                "Sibling relayed {} wrap(s), overflow now {}",
                relayed,
                self.map.clock_overflow.load(Ordering::Acquire)
            );
        }
        relayed
    }

    /// Sibling loop for wall-clock boards: service every `period` until
    /// `done` is set.
    pub fn run_sibling(&self, done: &AtomicBool, period: Duration) {
        while !done.load(Ordering::Acquire) {
            self.service_sibling();
            self.check_stop(self.now());
            std::thread::sleep(period);
        }
    }

    /// Completion signals asserted so far.
    pub fn signals(&self) -> Vec<SignalEvent> {
        self.signals.lock().clone()
    }

    /// `TMR_GLB_CFG` as last written by the sampler.
    pub fn timer_config(&self) -> GlobalConfig {
        GlobalConfig::from_bits_retain(self.timer_cfg.load(Ordering::Acquire))
    }

    /// `TMR_COMPEN` as last written by the sampler.
    pub fn compensation(&self) -> u32 {
        self.compensation.load(Ordering::Acquire)
    }

    /// Hardware handles for a sampler.
    pub fn board(&self) -> Board<SimTimer<'_>, SimInputs<'_>, SimSignal<'_>, SimDelay<'_>> {
        Board {
            timer: SimTimer { board: self },
            inputs: SimInputs { board: self },
            signal: SimSignal { board: self },
            delay: SimDelay { board: self },
        }
    }

    fn active_lines(&self, now: u64) -> LineMask {
        self.pulses
            .iter()
            .filter(|p| p.active_at(now))
            .fold(LineMask::empty(), |acc, p| acc | p.lines)
    }

    fn advance(&self, cycles: u64) {
        match self.clock {
            SimClock::Virtual => {
                let now = self.virtual_now.fetch_add(cycles, Ordering::AcqRel) + cycles;
                self.relay.service(self.map, self.start_count, now);
                self.check_stop(now);
            }
            SimClock::Wall { .. } => {
                let deadline = self.now().saturating_add(cycles);
                while self.now() < deadline {
                    std::hint::spin_loop();
                }
                self.check_stop(self.now());
            }
        }
    }

    fn check_stop(&self, now: u64) {
        if now >= self.stop_at.load(Ordering::Acquire) && !self.map.stop_requested() {
            trace!(cycle = now, "scheduled stop reached");
            self.map.run_flag.store(1, Ordering::Release);
        }
    }
}

/// Simulated IEP counter.
pub struct SimTimer<'b> {
    board: &'b SimBoard<'b>,
}

impl HardwareTimer for SimTimer<'_> {
    fn configure(&mut self) {
        let board = self.board;
        board.relay.clear(board.start_count, board.now());
        board.timer_cfg.store(
            (GlobalConfig::CNT_ENABLE | GlobalConfig::DEFAULT_INC_1).bits(),
            Ordering::Release,
        );
        board.compensation.store(0, Ordering::Release);
    }

    fn count(&self) -> u32 {
        self.board.count_at(self.board.now())
    }

    fn overflow_pending(&self) -> bool {
        self.board
            .relay
            .pending(self.board.start_count, self.board.now())
    }
}

/// Simulated active-low input register. Idle lines read 1.
pub struct SimInputs<'b> {
    board: &'b SimBoard<'b>,
}

impl InputPort for SimInputs<'_> {
    fn read(&mut self) -> u32 {
        let board = self.board;
        let raw = !board.active_lines(board.now()).bits();
        match board.clock {
            SimClock::Virtual => board.advance(board.poll_cycles),
            SimClock::Wall { .. } => board.check_stop(board.now()),
        }
        raw
    }
}

/// Simulated output line. Records every assertion.
pub struct SimSignal<'b> {
    board: &'b SimBoard<'b>,
}

impl SignalLine for SimSignal<'_> {
    fn assert_pattern(&mut self, pattern: u32) {
        let event = SignalEvent {
            pattern,
            cycle: self.board.now(),
        };
        self.board.signals.lock().push(event);
    }
}

/// Dead-time against the board clock.
pub struct SimDelay<'b> {
    board: &'b SimBoard<'b>,
}

impl Delay for SimDelay<'_> {
    fn delay_cycles(&mut self, cycles: u64) {
        self.board.advance(cycles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_time_moves_with_reads_and_delays() {
        let map = SharedMemoryMap::new();
        let sim = SimBoard::new(&map, SimClock::Virtual).with_poll_cycles(4);
        let mut hw = sim.board();

        assert_eq!(hw.inputs.read(), u32::MAX);
        assert_eq!(sim.now(), 4);
        hw.delay.delay_cycles(96);
        assert_eq!(sim.now(), 100);
        assert_eq!(hw.timer.count(), 100);
    }

    #[test]
    fn zero_poll_cycles_still_advance_time() {
        let map = SharedMemoryMap::new();
        let sim = SimBoard::new(&map, SimClock::Virtual).with_poll_cycles(0);
        sim.request_stop_at(3);
        let mut hw = sim.board();

        for _ in 0..3 {
            hw.inputs.read();
        }
        assert_eq!(sim.now(), 3);
        assert!(map.stop_requested());
    }

    #[test]
    fn pulses_read_low_while_held() {
        let map = SharedMemoryMap::new();
        let sim = SimBoard::new(&map, SimClock::Virtual)
            .with_poll_cycles(10)
            .with_pulse(Pulse::new(10, 10, LineMask::ACTUATOR_2_COLD));
        let mut hw = sim.board();

        assert_eq!(hw.inputs.read(), u32::MAX); // t=0
        assert_eq!(hw.inputs.read(), !(1 << 10)); // t=10
        assert_eq!(hw.inputs.read(), u32::MAX); // t=20
    }

    #[test]
    fn configure_writes_free_run_settings() {
        let map = SharedMemoryMap::new();
        let sim = SimBoard::new(&map, SimClock::Virtual)
            .with_start_count(u32::MAX)
            .with_relay_lag(1_000);
        let mut hw = sim.board();
        hw.delay.delay_cycles(1);
        assert!(hw.timer.overflow_pending());

        hw.timer.configure();
        assert_eq!(sim.timer_config().bits(), 0x11);
        assert_eq!(sim.compensation(), 0);
        assert!(!hw.timer.overflow_pending());
        // A wrap cleared by configuration is never counted.
        hw.delay.delay_cycles(2_000);
        assert_eq!(map.clock_overflow.load(Ordering::Acquire), 0);
    }

    #[test]
    fn lagging_sibling_leaves_flag_pending() {
        let map = SharedMemoryMap::new();
        let sim = SimBoard::new(&map, SimClock::Virtual)
            .with_start_count(u32::MAX - 9)
            .with_relay_lag(50);
        let mut hw = sim.board();

        hw.delay.delay_cycles(20);
        assert_eq!(hw.timer.count(), 10);
        assert!(hw.timer.overflow_pending());
        assert_eq!(map.clock_overflow.load(Ordering::Acquire), 0);

        hw.delay.delay_cycles(50);
        assert!(!hw.timer.overflow_pending());
        assert_eq!(map.clock_overflow.load(Ordering::Acquire), 1);
    }

    #[test]
    fn scheduled_stop_sets_run_flag() {
        let map = SharedMemoryMap::new();
        let sim = SimBoard::new(&map, SimClock::Virtual);
        sim.request_stop_at(1_000);
        let mut hw = sim.board();

        hw.delay.delay_cycles(999);
        assert!(!map.stop_requested());
        hw.delay.delay_cycles(1);
        assert!(map.stop_requested());
    }

    #[test]
    fn signals_are_recorded_with_time() {
        let map = SharedMemoryMap::new();
        let sim = SimBoard::new(&map, SimClock::Virtual);
        let mut hw = sim.board();
        hw.delay.delay_cycles(7);
        hw.signal.assert_pattern(0x28);
        assert_eq!(
            sim.signals(),
            vec![SignalEvent {
                pattern: 0x28,
                cycle: 7
            }]
        );
    }
}
