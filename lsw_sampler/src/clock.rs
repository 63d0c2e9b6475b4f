//! Clock capture against the shared counter and the sibling's overflow word.
//!
//! The sampler never increments the overflow word itself; the sibling does,
//! once per wrap. Between a wrap and the sibling's update the timer's own
//! overflow flag is still set, so the captured overflow is
//! `overflow_word + flag`. This closes the window where the counter has
//! already wrapped but the word has not moved yet.
//!
//! It does not close the window where the counter is read just before a wrap
//! and the (already updated) word just after; that capture lands one period
//! late. The host sees the jump and nothing else.

use crate::hw::HardwareTimer;
use lsw_common::{SharedMemoryMap, absolute_ticks};
use std::sync::atomic::Ordering;

/// Raw counter and overflow count taken at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockStamp {
    /// Raw counter value.
    pub raw: u32,
    /// Overflow count, flag folded in.
    pub overflow: u32,
}

impl ClockStamp {
    /// `overflow * 2^32 + raw`.
    #[inline]
    pub const fn absolute(&self) -> u64 {
        absolute_ticks(self.overflow, self.raw)
    }
}

/// Capture the counter, then the overflow word plus the pending flag.
#[inline]
pub fn capture<T: HardwareTimer>(timer: &T, map: &SharedMemoryMap) -> ClockStamp {
    let raw = timer.count();
    let overflow = map
        .clock_overflow
        .load(Ordering::Acquire)
        .wrapping_add(timer.overflow_pending() as u32);
    ClockStamp { raw, overflow }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct StubTimer {
        count: Cell<u32>,
        pending: Cell<bool>,
    }

    impl HardwareTimer for StubTimer {
        fn configure(&mut self) {}
        fn count(&self) -> u32 {
            self.count.get()
        }
        fn overflow_pending(&self) -> bool {
            self.pending.get()
        }
    }

    #[test]
    fn capture_without_pending_wrap() {
        let map = SharedMemoryMap::new();
        map.clock_overflow.store(4, Ordering::Release);
        let timer = StubTimer {
            count: Cell::new(100),
            pending: Cell::new(false),
        };
        let stamp = capture(&timer, &map);
        assert_eq!(stamp, ClockStamp { raw: 100, overflow: 4 });
        assert_eq!(stamp.absolute(), (4u64 << 32) + 100);
    }

    #[test]
    fn pending_flag_is_folded_in() {
        let map = SharedMemoryMap::new();
        map.clock_overflow.store(4, Ordering::Release);
        let timer = StubTimer {
            count: Cell::new(3),
            pending: Cell::new(true),
        };
        // Counter already wrapped, sibling has not caught up yet.
        let stamp = capture(&timer, &map);
        assert_eq!(stamp.overflow, 5);
    }

    #[test]
    fn stamps_straddling_a_wrap_are_ordered() {
        let map = SharedMemoryMap::new();
        let timer = StubTimer {
            count: Cell::new(u32::MAX - 1),
            pending: Cell::new(false),
        };
        let before = capture(&timer, &map);

        timer.count.set(10);
        timer.pending.set(true);
        let during = capture(&timer, &map);

        map.clock_overflow.store(1, Ordering::Release);
        timer.pending.set(false);
        timer.count.set(20);
        let after = capture(&timer, &map);

        assert!(before.absolute() < during.absolute());
        assert!(during.absolute() < after.absolute());
    }
}
