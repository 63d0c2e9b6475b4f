//! Double-buffer packet writer.
//!
//! Two slots, one readiness word. The writer fills the inactive slot with
//! relaxed stores, then publishes its 1-based index with a release store,
//! then flips to the other slot. A host that acquires the readiness word
//! therefore sees every field of the slot it names.
//!
//! ```text
//!   publish n     publish n+1   publish n+2
//!   slot 0 ──►1   slot 1 ──►2   slot 0 ──►1
//! ```
//!
//! While the host reads slot k, the next publish goes to the other slot.
//! A host that stalls across two publishes can still see a mixed packet;
//! the header check is its only guard.

use lsw_common::consts::{LIMIT_HEADER, SLOT_COUNT};
use lsw_common::{LimitPacket, SharedMemoryMap};
use std::sync::atomic::Ordering;
use tracing::trace;

/// Single writer of the packet slots and the readiness word.
pub struct DoubleBufferWriter<'m> {
    map: &'m SharedMemoryMap,
    /// 0-based index of the inactive slot.
    slot: usize,
    published: u64,
}

impl<'m> DoubleBufferWriter<'m> {
    /// Writer over `map`. Call [`init`](Self::init) before the first publish.
    pub fn new(map: &'m SharedMemoryMap) -> Self {
        Self {
            map,
            slot: 0,
            published: 0,
        }
    }

    /// Clear readiness and stamp the header into both slots.
    pub fn init(&mut self) {
        self.map.ready.store(0, Ordering::Release);
        for slot in &self.map.packets {
            slot.header.store(LIMIT_HEADER, Ordering::Relaxed);
        }
        self.slot = 0;
    }

    /// 0-based index of the slot the next publish writes.
    #[inline]
    pub fn inactive_slot(&self) -> usize {
        self.slot
    }

    /// Number of completed publishes.
    #[inline]
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Write every field of `packet` into the inactive slot without
    /// publishing it.
    pub fn stage(&mut self, packet: &LimitPacket) -> StagedPacket<'_, 'm> {
        self.map.packets[self.slot].store(packet);
        StagedPacket { writer: self }
    }

    /// Stage and commit in one step. Returns the published readiness value.
    #[inline]
    pub fn publish(&mut self, packet: &LimitPacket) -> u32 {
        self.stage(packet).commit()
    }
}

/// A fully written, not yet published slot.
#[must_use = "a staged packet is invisible to the host until committed"]
pub struct StagedPacket<'w, 'm> {
    writer: &'w mut DoubleBufferWriter<'m>,
}

impl StagedPacket<'_, '_> {
    /// 0-based slot holding the staged packet.
    pub fn slot(&self) -> usize {
        self.writer.slot
    }

    /// Publish the slot's 1-based index, then flip to the other slot.
    pub fn commit(self) -> u32 {
        let writer = self.writer;
        let index = writer.slot as u32 + 1;
        writer.map.ready.store(index, Ordering::Release);
        writer.slot = (writer.slot + 1) % SLOT_COUNT;
        writer.published += 1;
        trace!(ready = index, published = writer.published, "limit packet published");
        index
    }
}
