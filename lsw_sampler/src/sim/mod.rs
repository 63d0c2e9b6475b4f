//! Simulated board for running the sampler without a co-processor.
//!
//! The board implements every hardware seam over plain atomics and models
//! the sibling co-processor's overflow relay. Two time bases are available:
//! virtual time for deterministic tests and wall-clock time for the
//! stand-alone binary.

pub mod board;
pub mod relay;

pub use board::{
    Pulse, SignalEvent, SimBoard, SimClock, SimDelay, SimInputs, SimSignal, SimTimer,
};
pub use relay::OverflowRelay;
