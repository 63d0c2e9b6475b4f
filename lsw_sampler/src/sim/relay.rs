//! Sibling overflow relay.
//!
//! On the real board a second co-processor watches the counter's overflow
//! flag, increments the shared overflow word and clears the flag. This
//! model does the same against a simulated counter, optionally a fixed
//! number of cycles late, so the window where the flag is set but the word
//! has not moved yet can be exercised.

use lsw_common::SharedMemoryMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cycle at which wrap number `k` (1-based) happens for a counter that
/// started at `start_count`.
#[inline]
pub const fn wrap_cycle(start_count: u32, k: u64) -> u64 {
    (k << 32) - start_count as u64
}

/// Wraps that have happened by cycle `now`.
#[inline]
pub const fn wraps_at(start_count: u32, now: u64) -> u64 {
    (start_count as u64 + now) >> 32
}

/// Tracks which wraps have been counted and cleared.
#[derive(Debug)]
pub struct OverflowRelay {
    lag: u64,
    cleared: AtomicU64,
}

impl OverflowRelay {
    /// A relay that reacts `lag` cycles after each wrap.
    pub const fn new(lag: u64) -> Self {
        Self {
            lag,
            cleared: AtomicU64::new(0),
        }
    }

    /// Reaction lag in cycles.
    pub fn lag(&self) -> u64 {
        self.lag
    }

    /// Whether the counter's overflow flag reads set.
    #[inline]
    pub fn pending(&self, start_count: u32, now: u64) -> bool {
        wraps_at(start_count, now) > self.cleared.load(Ordering::Acquire)
    }

    /// Clear the flag without counting (timer configuration).
    pub fn clear(&self, start_count: u32, now: u64) {
        self.cleared
            .store(wraps_at(start_count, now), Ordering::Release);
    }

    /// Count and clear every wrap whose lag has elapsed by `now`.
    /// Returns the number of wraps relayed.
    pub fn service(&self, map: &SharedMemoryMap, start_count: u32, now: u64) -> u32 {
        let mut relayed = 0;
        loop {
            let next = self.cleared.load(Ordering::Acquire) + 1;
            if wrap_cycle(start_count, next).saturating_add(self.lag) > now {
                return relayed;
            }
            // Word first, then the flag, in the sibling's order.
            map.clock_overflow.fetch_add(1, Ordering::AcqRel);
            self.cleared.store(next, Ordering::Release);
            relayed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_arithmetic() {
        assert_eq!(wrap_cycle(0, 1), 1 << 32);
        assert_eq!(wrap_cycle(u32::MAX, 1), 1);
        assert_eq!(wraps_at(u32::MAX, 0), 0);
        assert_eq!(wraps_at(u32::MAX, 1), 1);
        assert_eq!(wraps_at(0, 3 << 32), 3);
    }

    #[test]
    fn service_relays_after_lag() {
        let map = SharedMemoryMap::new();
        let relay = OverflowRelay::new(100);
        let start = u32::MAX - 9; // wraps at cycle 10

        assert!(!relay.pending(start, 9));
        assert!(relay.pending(start, 10));
        assert_eq!(relay.service(&map, start, 50), 0);
        assert_eq!(map.clock_overflow.load(Ordering::Acquire), 0);

        assert_eq!(relay.service(&map, start, 110), 1);
        assert_eq!(map.clock_overflow.load(Ordering::Acquire), 1);
        assert!(!relay.pending(start, 110));
    }

    #[test]
    fn service_catches_up_on_several_wraps() {
        let map = SharedMemoryMap::new();
        let relay = OverflowRelay::new(0);
        assert_eq!(relay.service(&map, 0, (3 << 32) + 5), 3);
        assert_eq!(map.clock_overflow.load(Ordering::Acquire), 3);
    }

    #[test]
    fn clear_drops_pending_wrap_uncounted() {
        let map = SharedMemoryMap::new();
        let relay = OverflowRelay::new(0);
        relay.clear(u32::MAX, 5);
        assert!(!relay.pending(u32::MAX, 5));
        assert_eq!(relay.service(&map, u32::MAX, 5), 0);
        assert_eq!(map.clock_overflow.load(Ordering::Acquire), 0);
    }
}
