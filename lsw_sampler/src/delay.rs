//! Calibrated debounce dead-time and a wall-clock busy-wait.

use crate::hw::Delay;
use std::time::{Duration, Instant};

/// Debounce dead-time expressed in counter cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceDelay {
    cycles: u64,
}

impl DebounceDelay {
    /// Use an explicit cycle count.
    pub const fn from_cycles(cycles: u64) -> Self {
        Self { cycles }
    }

    /// Convert a dead-time to cycles at `clock_hz`, rounding up.
    pub fn from_duration(dead_time: Duration, clock_hz: u64) -> Self {
        let cycles = (dead_time.as_nanos() * clock_hz as u128).div_ceil(1_000_000_000);
        Self {
            cycles: u64::try_from(cycles).unwrap_or(u64::MAX),
        }
    }

    /// Dead-time in cycles.
    #[inline]
    pub const fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Dead-time as a duration at `clock_hz`.
    pub fn as_duration(&self, clock_hz: u64) -> Duration {
        cycles_to_duration(self.cycles, clock_hz)
    }
}

/// Convert counter cycles to wall time at `clock_hz`.
pub fn cycles_to_duration(cycles: u64, clock_hz: u64) -> Duration {
    if clock_hz == 0 {
        return Duration::ZERO;
    }
    let nanos = cycles as u128 * 1_000_000_000 / clock_hz as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Busy-wait on the host's monotonic clock, calibrated to a counter rate.
///
/// Spins rather than sleeps so the dead-time has the same shape as on the
/// co-processor: no yield, no wake-up jitter from the OS scheduler.
#[derive(Debug, Clone, Copy)]
pub struct SpinDelay {
    clock_hz: u64,
}

impl SpinDelay {
    /// Calibrate for a counter running at `clock_hz`.
    pub fn new(clock_hz: u64) -> Self {
        Self { clock_hz }
    }
}

impl Delay for SpinDelay {
    fn delay_cycles(&mut self, cycles: u64) {
        let deadline = Instant::now() + cycles_to_duration(cycles, self.clock_hz);
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }
    }
}
