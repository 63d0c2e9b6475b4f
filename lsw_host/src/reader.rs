//! Host-side reader of the limit-switch double buffer.
//!
//! The reader acquires the readiness word, copies the slot it names and
//! checks the magic header before handing the packet out. It never writes
//! the readiness word: freshness is tracked locally by comparing the
//! readiness value and the slot content against the last packet consumed.
//!
//! The only word the host writes is the run flag ([`LimitReader::request_stop`]).

use crate::error::{HostResult, ReadError};
use lsw_common::{LimitPacket, MappedRegion, SharedMemoryMap};
use std::ops::Deref;
use std::path::Path;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

/// Reader over any handle that dereferences to the shared map
/// (`&SharedMemoryMap`, [`MappedRegion`], ...).
pub struct LimitReader<M> {
    map: M,
    last: Option<(u32, LimitPacket)>,
    consumed: u64,
    missed: u64,
    rejected: u64,
    last_rejection: Option<ReadError>,
    rejection_warnings: u64,
}

impl LimitReader<MappedRegion> {
    /// Attach to a region file written by a sampler.
    pub fn attach(path: &Path) -> HostResult<Self> {
        let region = MappedRegion::attach(path)?;
        info!("Attached to limit region {}", path.display());
        Ok(Self::new(region))
    }
}

impl<M: Deref<Target = SharedMemoryMap>> LimitReader<M> {
    /// Reader over `map`. Whatever is already published counts as fresh.
    pub fn new(map: M) -> Self {
        Self {
            map,
            last: None,
            consumed: 0,
            missed: 0,
            rejected: 0,
            last_rejection: None,
            rejection_warnings: 0,
        }
    }

    /// The shared map.
    pub fn map(&self) -> &SharedMemoryMap {
        &self.map
    }

    /// Latest published packet, validated, without affecting freshness.
    ///
    /// `Ok(None)` while nothing has been published.
    pub fn snapshot(&self) -> Result<Option<LimitPacket>, ReadError> {
        Ok(self.read_slot()?.map(|(_, packet)| packet))
    }

    /// Next packet not yet consumed by this reader.
    ///
    /// Returns `Ok(None)` when nothing new was published since the last call.
    /// When the same slot comes back with different content the sampler
    /// lapped the reader; that is counted in [`missed`](Self::missed).
    ///
    /// A slot that keeps failing validation is logged at `warn` once per
    /// distinct error; repeats go to `debug` and [`rejected`](Self::rejected).
    pub fn poll(&mut self) -> Result<Option<LimitPacket>, ReadError> {
        let current = match self.read_slot() {
            Ok(Some(current)) => current,
            Ok(None) => {
                self.last_rejection = None;
                return Ok(None);
            }
            Err(e) => {
                self.rejected += 1;
                if self.last_rejection == Some(e) {
                    debug!("Rejected limit slot again: {}", e);
                } else {
                    self.rejection_warnings += 1;
                    warn!("Rejected limit slot: {}", e);
                }
                self.last_rejection = Some(e);
                return Err(e);
            }
        };
        self.last_rejection = None;

        if self.last == Some(current) {
            return Ok(None);
        }
        if let Some((last_ready, _)) = self.last {
            if last_ready == current.0 {
                self.missed += 1;
                debug!("Reader lapped on slot {}", current.0);
            }
        }

        self.last = Some(current);
        self.consumed += 1;
        Ok(Some(current.1))
    }

    /// Ask the sampler to stop. It halts within one dead-time plus one poll.
    pub fn request_stop(&self) {
        self.map.run_flag.store(1, Ordering::Release);
        info!("Stop requested");
    }

    /// Whether a stop has been requested.
    pub fn stop_requested(&self) -> bool {
        self.map.stop_requested()
    }

    /// Current overflow count maintained by the sibling.
    pub fn overflow_count(&self) -> u32 {
        self.map.clock_overflow.load(Ordering::Acquire)
    }

    /// Packets consumed through [`poll`](Self::poll).
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Lap events: at least one packet was overwritten before it was read.
    ///
    /// A lower bound. Only an even number of unread publishes brings the
    /// same slot back; an odd-length gap (readiness `1 -> 2, 1, 2`) lands on
    /// the other slot and looks like a normal step.
    pub fn missed(&self) -> u64 {
        self.missed
    }

    /// Reads refused for an invalid readiness index or header.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    /// Rejections that differed from the one before and were logged at `warn`.
    pub fn rejection_warnings(&self) -> u64 {
        self.rejection_warnings
    }

    fn read_slot(&self) -> Result<Option<(u32, LimitPacket)>, ReadError> {
        let ready = self.map.ready_index();
        match ready {
            0 => Ok(None),
            1 | 2 => {
                let packet = self.map.packets[ready as usize - 1].load();
                if !packet.is_header_valid() {
                    return Err(ReadError::InvalidHeader {
                        slot: ready,
                        found: packet.header,
                    });
                }
                Ok(Some((ready, packet)))
            }
            other => Err(ReadError::InvalidReadyIndex(other)),
        }
    }
}
