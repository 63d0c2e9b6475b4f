//! Hardware traits the sampler runs against.
//!
//! The sampler core is generic over these four seams plus the shared-memory
//! map. A co-processor port implements them over its registers; the
//! [`sim`](crate::sim) module implements them over a simulated board.
//!
//! | Trait             | Reference target                      |
//! |-------------------|---------------------------------------|
//! | [`HardwareTimer`] | IEP free-running counter              |
//! | [`InputPort`]     | input register (`R31`), active low    |
//! | [`SignalLine`]    | output register (`R31` event pattern) |
//! | [`Delay`]         | `__delay_cycles` busy-wait            |
//! | [`Halt`]          | `HALT` instruction                    |
//!
//! None of these calls may allocate or block on anything but the clock.

/// 32-bit free-running counter with an observable overflow flag.
pub trait HardwareTimer {
    /// One-time setup: clear the overflow status, enable increment-by-one
    /// free-run mode, disable compensation.
    fn configure(&mut self);

    /// Current raw counter value.
    fn count(&self) -> u32;

    /// Whether the counter wrapped since the status was last cleared.
    fn overflow_pending(&self) -> bool;
}

/// Raw digital input register.
pub trait InputPort {
    /// Current register value. Lines are active low: an asserted line reads 0.
    fn read(&mut self) -> u32;
}

/// Output line used for the completion signal.
pub trait SignalLine {
    /// Drive `pattern` onto the output line.
    fn assert_pattern(&mut self, pattern: u32);
}

/// Calibrated busy-wait.
pub trait Delay {
    /// Spin for `cycles` counter cycles.
    fn delay_cycles(&mut self, cycles: u64);
}

/// Permanent processor stop.
pub trait Halt {
    /// Stop executing. Never returns.
    fn halt(self) -> !;
}
