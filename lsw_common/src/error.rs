//! Error types for shared-memory region mapping

use thiserror::Error;

/// Errors that can occur while creating or attaching a mapped region
#[derive(Error, Debug)]
pub enum RegionError {
    /// Region file does not exist
    #[error("Region not found: {path}")]
    NotFound {
        /// Region file path
        path: String,
    },

    /// Region file is smaller than the shared-memory map
    #[error("Invalid region size: {size} bytes (need at least {required})")]
    InvalidSize {
        /// Actual file size in bytes
        size: usize,
        /// Size of the shared-memory map
        required: usize,
    },

    /// Mapping is not word aligned
    #[error("Memory alignment error: address {address:#x} not aligned to {alignment}")]
    AlignmentError {
        /// Memory address
        address: usize,
        /// Required alignment
        alignment: usize,
    },

    /// IO error
    #[error("IO error: {source}")]
    Io {
        /// Source IO error
        #[from]
        source: std::io::Error,
    },
}

/// Result type for region operations
pub type RegionResult<T> = Result<T, RegionError>;
