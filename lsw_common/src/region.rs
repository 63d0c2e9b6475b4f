//! File-backed mapping of the shared-memory map.
//!
//! On the co-processor the map lives at a fixed physical address
//! ([`SharedMemoryMap::at_address`]). Off target, the sampler and the host
//! share it through a memory-mapped file (typically under `/dev/shm`), which
//! gives the same byte-exact layout to two independent processes.

use crate::error::{RegionError, RegionResult};
use crate::layout::SharedMemoryMap;
use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::ops::Deref;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A [`SharedMemoryMap`] backed by a memory-mapped file.
pub struct MappedRegion {
    path: PathBuf,
    mmap: MmapMut,
}

impl MappedRegion {
    /// Create (or truncate) the region file and map it zeroed.
    pub fn create(path: &Path) -> RegionResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .mode(0o600) // Owner read/write only
            .open(path)?;

        file.set_len(SharedMemoryMap::SIZE as u64)?;

        let mmap = unsafe { MmapOptions::new().populate().map_mut(&file)? };
        debug!(
            "Created region {} ({} bytes)",
            path.display(),
            SharedMemoryMap::SIZE
        );
        Self::from_mmap(path, mmap)
    }

    /// Attach to an existing region file.
    pub fn attach(path: &Path) -> RegionResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RegionError::NotFound {
                        path: path.display().to_string(),
                    }
                } else {
                    RegionError::Io { source: e }
                }
            })?;

        let size = file.metadata()?.len() as usize;
        if size < SharedMemoryMap::SIZE {
            return Err(RegionError::InvalidSize {
                size,
                required: SharedMemoryMap::SIZE,
            });
        }

        let mmap = unsafe { MmapOptions::new().len(SharedMemoryMap::SIZE).map_mut(&file)? };
        debug!("Attached region {}", path.display());
        Self::from_mmap(path, mmap)
    }

    fn from_mmap(path: &Path, mmap: MmapMut) -> RegionResult<Self> {
        let address = mmap.as_ptr() as usize;
        let alignment = std::mem::align_of::<SharedMemoryMap>();
        if address % alignment != 0 {
            return Err(RegionError::AlignmentError { address, alignment });
        }
        Ok(Self {
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Deref for MappedRegion {
    type Target = SharedMemoryMap;

    fn deref(&self) -> &SharedMemoryMap {
        // SAFETY: the mapping is at least SIZE bytes, aligned (checked in
        // from_mmap) and lives as long as self. All fields are atomics, so
        // concurrent access from other processes is sound.
        unsafe { &*(self.mmap.as_ptr() as *const SharedMemoryMap) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn create_then_attach_shares_words() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lsw_region");

        let writer = MappedRegion::create(&path).unwrap();
        let reader = MappedRegion::attach(&path).unwrap();

        writer.clock_overflow.store(7, Ordering::Release);
        assert_eq!(reader.clock_overflow.load(Ordering::Acquire), 7);

        reader.run_flag.store(1, Ordering::Release);
        assert!(writer.stop_requested());
    }

    #[test]
    fn attach_missing_region() {
        let dir = tempfile::tempdir().unwrap();
        let result = MappedRegion::attach(&dir.path().join("missing"));
        assert!(matches!(result, Err(RegionError::NotFound { .. })));
    }

    #[test]
    fn attach_short_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short");
        std::fs::write(&path, [0u8; 64]).unwrap();
        let result = MappedRegion::attach(&path);
        assert!(matches!(
            result,
            Err(RegionError::InvalidSize { size: 64, .. })
        ));
    }
}
