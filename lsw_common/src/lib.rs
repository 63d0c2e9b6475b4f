//! LSW Common Library
//!
//! Shared definitions for the limit-switch sampler and its host-side reader.
//!
//! # Module Structure
//!
//! - [`consts`] - Shared-memory offsets, magic header, reference clock and wiring
//! - [`layout`] - Byte-exact `SharedMemoryMap` of per-word atomics
//! - [`packet`] - `LimitPacket`, `LineMask`, absolute-time reconstruction
//! - [`region`] - File-backed mapping of the map for off-target runs
//! - [`config`] - TOML configuration loading
//! - [`error`] - Region error types
//!
//! # Usage
//!
//! ```rust
//! use lsw_common::layout::SharedMemoryMap;
//! use lsw_common::packet::absolute_ticks;
//!
//! let map = SharedMemoryMap::new();
//! assert_eq!(map.ready_index(), 0);
//! assert_eq!(absolute_ticks(1, 0), 1 << 32);
//! ```

#![deny(missing_docs)]

pub mod config;
pub mod consts;
pub mod error;
pub mod layout;
pub mod packet;
pub mod region;

pub use config::{ConfigError, ConfigLoader, LswConfig};
pub use error::{RegionError, RegionResult};
pub use layout::{PacketSlot, SharedMemoryMap};
pub use packet::{LimitPacket, LineMask, absolute_ticks};
pub use region::MappedRegion;
