//! # LSW Sampler
//!
//! Limit-switch sampler: polls an active-low input register, timestamps
//! every assertion against a shared free-running counter and publishes it to
//! a host through a lock-free double buffer in shared memory.
//!
//! # Module Structure
//!
//! - [`hw`] - Hardware seams (timer, inputs, signal line, delay, halt)
//! - [`iep`] - IEP timer register block and its [`hw::HardwareTimer`]
//! - [`input`] - Active-line detection
//! - [`clock`] - Counter + overflow capture
//! - [`writer`] - Double-buffer packet writer
//! - [`delay`] - Debounce dead-time calibration
//! - [`control`] - INIT / SAMPLING / HALTING state machine
//! - [`sim`] - Simulated board and sibling overflow relay
//! - [`target`] - Reference target board over memory-mapped registers
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         LimitSampler                          │
//! │  InputSampler ──► clock::capture ──► DoubleBufferWriter       │
//! │       │                 │                     │               │
//! │  InputPort       HardwareTimer        SharedMemoryMap         │
//! └───────┼─────────────────┼─────────────────────┼───────────────┘
//!         ▼                 ▼                     ▼
//!   input register     IEP counter        shared RAM (host)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use lsw_common::{LineMask, SharedMemoryMap};
//! use lsw_sampler::control::{LimitSampler, SamplerSettings};
//! use lsw_sampler::sim::{Pulse, SimBoard, SimClock};
//!
//! let map = SharedMemoryMap::new();
//! let sim = SimBoard::new(&map, SimClock::Virtual)
//!     .with_pulse(Pulse::new(100, 10, LineMask::ACTUATOR_1_COLD));
//! sim.request_stop_at(1_000);
//!
//! let report = LimitSampler::new(&map, sim.board(), SamplerSettings::default()).run();
//! assert_eq!(report.published, 1);
//! assert_eq!(map.ready_index(), 1);
//! ```

#![deny(missing_docs)]

pub mod clock;
pub mod control;
pub mod delay;
pub mod hw;
pub mod iep;
pub mod input;
pub mod sim;
pub mod target;
pub mod writer;

pub use control::{Board, HaltReport, LimitSampler, SamplerSettings, SamplerState, Step, run_and_halt};
pub use writer::{DoubleBufferWriter, StagedPacket};
