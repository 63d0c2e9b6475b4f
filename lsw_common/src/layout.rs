//! Byte-exact shared-memory map between sampler, sibling and host.
//!
//! ## Layout (offsets from the shared RAM base)
//!
//! | Offset   | Field            | Writer  | Reader        |
//! |----------|------------------|---------|---------------|
//! | `0x0000` | run flag         | host    | sampler       |
//! | `0x0008` | overflow counter | sibling | sampler, host |
//! | `0x0010` | sibling region   | sibling | host          |
//! | `0x1850` | readiness word   | sampler | host          |
//! | `0x1858` | packet slot 0    | sampler | host          |
//! | `0x1868` | packet slot 1    | sampler | host          |
//!
//! Every word is an `AtomicU32`, so each access is an individual, observable
//! 32-bit load or store. Packet fields use relaxed accesses; the readiness
//! word is the single synchronisation point (release store by the sampler,
//! acquire load by the host).

use crate::consts::{
    LIMIT_HEADER, OVERFLOW_OFFSET, PACKET_SIZE, PACKETS_OFFSET, READY_OFFSET, RUN_FLAG_OFFSET,
    SIBLING_REGION_OFFSET, SLOT_COUNT,
};
use crate::packet::LimitPacket;
use static_assertions::const_assert_eq;
use std::mem::{offset_of, size_of};
use std::sync::atomic::{AtomicU32, Ordering};

/// Words reserved for the sibling between the overflow counter and readiness.
const SIBLING_WORDS: usize = (READY_OFFSET - SIBLING_REGION_OFFSET) / 4;

/// One packet slot in shared memory.
#[derive(Debug)]
#[repr(C)]
pub struct PacketSlot {
    /// Magic header word.
    pub header: AtomicU32,
    /// Raw counter at sample time.
    pub clock: AtomicU32,
    /// Overflow count at sample time.
    pub clock_overflow: AtomicU32,
    /// Active-line bitmask.
    pub state: AtomicU32,
}

const_assert_eq!(size_of::<PacketSlot>(), PACKET_SIZE);

impl PacketSlot {
    /// A zeroed slot.
    pub const fn new() -> Self {
        Self {
            header: AtomicU32::new(0),
            clock: AtomicU32::new(0),
            clock_overflow: AtomicU32::new(0),
            state: AtomicU32::new(0),
        }
    }

    /// Store every field of `packet`, header first. Relaxed; the caller
    /// orders these stores before its readiness publish.
    #[inline]
    pub fn store(&self, packet: &LimitPacket) {
        self.header.store(packet.header, Ordering::Relaxed);
        self.clock.store(packet.clock, Ordering::Relaxed);
        self.clock_overflow
            .store(packet.clock_overflow, Ordering::Relaxed);
        self.state.store(packet.state, Ordering::Relaxed);
    }

    /// Load every field. Relaxed; the caller acquires the readiness word first.
    #[inline]
    pub fn load(&self) -> LimitPacket {
        LimitPacket {
            header: self.header.load(Ordering::Relaxed),
            clock: self.clock.load(Ordering::Relaxed),
            clock_overflow: self.clock_overflow.load(Ordering::Relaxed),
            state: self.state.load(Ordering::Relaxed),
        }
    }
}

impl Default for PacketSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// The complete shared-memory map, from the run flag to the last packet slot.
#[derive(Debug)]
#[repr(C)]
pub struct SharedMemoryMap {
    /// 0 = running, nonzero = stop requested.
    pub run_flag: AtomicU32,
    _reserved0: AtomicU32,
    /// Timer wrap count maintained by the sibling.
    pub clock_overflow: AtomicU32,
    _reserved1: AtomicU32,
    /// Sibling encoder packets. Never touched by the limit sampler.
    pub sibling: [AtomicU32; SIBLING_WORDS],
    /// 0 = nothing published, else 1-based index of the latest complete slot.
    pub ready: AtomicU32,
    _reserved2: AtomicU32,
    /// The double buffer.
    pub packets: [PacketSlot; SLOT_COUNT],
}

const_assert_eq!(offset_of!(SharedMemoryMap, run_flag), RUN_FLAG_OFFSET);
const_assert_eq!(offset_of!(SharedMemoryMap, clock_overflow), OVERFLOW_OFFSET);
const_assert_eq!(offset_of!(SharedMemoryMap, sibling), SIBLING_REGION_OFFSET);
const_assert_eq!(offset_of!(SharedMemoryMap, ready), READY_OFFSET);
const_assert_eq!(offset_of!(SharedMemoryMap, packets), PACKETS_OFFSET);
const_assert_eq!(
    size_of::<SharedMemoryMap>(),
    PACKETS_OFFSET + SLOT_COUNT * PACKET_SIZE
);

impl SharedMemoryMap {
    /// Size of the map in bytes.
    pub const SIZE: usize = size_of::<Self>();

    /// A zeroed map, for in-process use and tests.
    pub const fn new() -> Self {
        Self {
            run_flag: AtomicU32::new(0),
            _reserved0: AtomicU32::new(0),
            clock_overflow: AtomicU32::new(0),
            _reserved1: AtomicU32::new(0),
            sibling: [const { AtomicU32::new(0) }; SIBLING_WORDS],
            ready: AtomicU32::new(0),
            _reserved2: AtomicU32::new(0),
            packets: [const { PacketSlot::new() }; SLOT_COUNT],
        }
    }

    /// View the map placed at a fixed physical address.
    ///
    /// # Safety
    ///
    /// `address` must be 4-byte aligned and point at [`SharedMemoryMap::SIZE`]
    /// bytes of memory that stay mapped for the rest of the program and are
    /// only ever accessed as 32-bit words.
    pub unsafe fn at_address(address: usize) -> &'static Self {
        // SAFETY: upheld by the caller.
        unsafe { &*(address as *const Self) }
    }

    /// Whether the host asked the sampler to stop.
    #[inline]
    pub fn stop_requested(&self) -> bool {
        self.run_flag.load(Ordering::Acquire) != 0
    }

    /// Current readiness word.
    #[inline]
    pub fn ready_index(&self) -> u32 {
        self.ready.load(Ordering::Acquire)
    }

    /// Whether a slot carries the expected header.
    pub fn slot_header_valid(&self, slot: usize) -> bool {
        self.packets
            .get(slot)
            .is_some_and(|s| s.header.load(Ordering::Relaxed) == LIMIT_HEADER)
    }
}

impl Default for SharedMemoryMap {
    fn default() -> Self {
        Self::new()
    }
}
