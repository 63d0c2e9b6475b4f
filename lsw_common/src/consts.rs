//! System-wide constants for the LSW workspace.
//!
//! Single source of truth for the shared-memory contract, the reference
//! target's clock and the default line assignment. Imported by the sampler
//! and the host, no duplication permitted.

/// Magic value written into every limit packet header.
///
/// The host must see this value before trusting a slot.
pub const LIMIT_HEADER: u32 = 0xF00D;

/// Number of packet slots in the double buffer.
pub const SLOT_COUNT: usize = 2;

/// Physical base address of the co-processor shared RAM on the reference target.
pub const SHARED_RAM_BASE: usize = 0x0001_0000;

/// Byte offset of the run flag word from the shared RAM base.
pub const RUN_FLAG_OFFSET: usize = 0x0000;

/// Byte offset of the clock overflow counter word.
pub const OVERFLOW_OFFSET: usize = 0x0008;

/// Byte offset of the first word reserved for the sibling's encoder packets.
pub const SIBLING_REGION_OFFSET: usize = 0x0010;

/// Byte offset of the readiness word.
pub const READY_OFFSET: usize = 0x1850;

/// Byte offset of packet slot 0. Slot 1 follows immediately.
pub const PACKETS_OFFSET: usize = 0x1858;

/// Size in bytes of one packet slot (four 32-bit words).
pub const PACKET_SIZE: usize = 16;

/// Physical base address of the IEP timer block on the reference target.
pub const IEP_BASE: usize = 0x0002_E000;

/// Hardware counter rate of the reference target (200 MHz).
pub const DEFAULT_CLOCK_HZ: u64 = 200_000_000;

/// Default debounce dead-time in milliseconds.
///
/// 12_000_000 cycles at 200 MHz.
pub const DEFAULT_DEBOUNCE_MS: u64 = 60;

/// Output pattern asserted once when the sampler halts.
pub const COMPLETION_SIGNAL: u32 = 0x28;

/// Input register bits wired to the six actuator limit switches.
pub const DEFAULT_LINE_BITS: [u8; 6] = [8, 9, 10, 11, 12, 13];

/// Human-readable names for [`DEFAULT_LINE_BITS`], same order.
pub const DEFAULT_LINE_NAMES: [&str; 6] = [
    "Actuator 1 Cold",
    "Actuator 1 Warm",
    "Actuator 2 Cold",
    "Actuator 2 Warm",
    "Actuator 3 Cold",
    "Actuator 3 Warm",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_word_aligned() {
        for offset in [
            RUN_FLAG_OFFSET,
            OVERFLOW_OFFSET,
            SIBLING_REGION_OFFSET,
            READY_OFFSET,
            PACKETS_OFFSET,
        ] {
            assert_eq!(offset % 4, 0, "offset {offset:#x} not word aligned");
        }
    }

    #[test]
    fn offsets_are_ordered() {
        assert!(RUN_FLAG_OFFSET < OVERFLOW_OFFSET);
        assert!(OVERFLOW_OFFSET < SIBLING_REGION_OFFSET);
        assert!(SIBLING_REGION_OFFSET < READY_OFFSET);
        assert!(READY_OFFSET < PACKETS_OFFSET);
    }

    #[test]
    fn default_debounce_matches_reference_cycle_count() {
        assert_eq!(DEFAULT_CLOCK_HZ * DEFAULT_DEBOUNCE_MS / 1000, 12_000_000);
    }

    #[test]
    fn default_lines_fit_in_register() {
        assert!(DEFAULT_LINE_BITS.iter().all(|&b| b < 32));
        assert_eq!(DEFAULT_LINE_BITS.len(), DEFAULT_LINE_NAMES.len());
    }
}
