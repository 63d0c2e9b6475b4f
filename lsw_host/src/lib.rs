//! # LSW Host
//!
//! Host-side consumer of the limit-switch shared-memory contract.
//!
//! # Module Structure
//!
//! - [`reader`] - `LimitReader`: readiness acquire, header check, freshness, stop request
//! - [`sample`] - `LimitSample`: absolute time and named lines
//! - [`monitor`] - Fixed-cadence polling loop with staleness warnings
//! - [`error`] - `ReadError`, `HostError`
//!
//! # Usage
//!
//! ```rust
//! use lsw_common::{LimitPacket, LineMask, SharedMemoryMap};
//! use lsw_host::LimitReader;
//! use std::sync::atomic::Ordering;
//!
//! let map = SharedMemoryMap::new();
//! map.packets[0].store(&LimitPacket::new(100, 0, LineMask::ACTUATOR_1_COLD));
//! map.ready.store(1, Ordering::Release);
//!
//! let mut reader = LimitReader::new(&map);
//! assert_eq!(reader.poll().unwrap().map(|p| p.clock), Some(100));
//! assert_eq!(reader.poll().unwrap(), None);
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod monitor;
pub mod reader;
pub mod sample;

pub use error::{HostError, HostResult, ReadError};
pub use monitor::{Monitor, MonitorStats};
pub use reader::LimitReader;
pub use sample::LimitSample;
