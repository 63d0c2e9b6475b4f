//! Error types for the host-side reader

use lsw_common::{ConfigError, RegionError};
use thiserror::Error;

/// A published slot the host refuses to trust.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// Readiness word is neither 0 nor a valid 1-based slot index
    #[error("Invalid readiness index: {0}")]
    InvalidReadyIndex(u32),

    /// Slot named by the readiness word does not carry the magic header
    #[error("Invalid header in slot {slot}: found {found:#06x}")]
    InvalidHeader {
        /// 1-based slot index
        slot: u32,
        /// Header word read from the slot
        found: u32,
    },
}

/// Top-level host error
#[derive(Error, Debug)]
pub enum HostError {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Region file could not be attached
    #[error("Region error: {0}")]
    Region(#[from] RegionError),

    /// Shared map content is not trustworthy
    #[error("Read error: {0}")]
    Read(#[from] ReadError),
}

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;
