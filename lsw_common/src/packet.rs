//! Limit packet value type, line mask and clock reconstruction.
//!
//! [`LimitPacket`] is the plain-value image of one shared-memory slot. The
//! sampler builds one per accepted assertion, the host copies one out of the
//! slot referenced by the readiness word.

use crate::consts::{LIMIT_HEADER, PACKET_SIZE};
use bitflags::bitflags;

bitflags! {
    /// Bitmask of monitored input lines, one bit per input register bit.
    ///
    /// Named constants cover the reference wiring (actuator limit switches on
    /// bits 8..13). Other deployments use [`LineMask::from_bits_retain`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct LineMask: u32 {
        /// Actuator 1, cold-side limit.
        const ACTUATOR_1_COLD = 1 << 8;
        /// Actuator 1, warm-side limit.
        const ACTUATOR_1_WARM = 1 << 9;
        /// Actuator 2, cold-side limit.
        const ACTUATOR_2_COLD = 1 << 10;
        /// Actuator 2, warm-side limit.
        const ACTUATOR_2_WARM = 1 << 11;
        /// Actuator 3, cold-side limit.
        const ACTUATOR_3_COLD = 1 << 12;
        /// Actuator 3, warm-side limit.
        const ACTUATOR_3_WARM = 1 << 13;

        const _ = !0;
    }
}

impl LineMask {
    /// The six actuator limit lines of the reference wiring.
    pub const ACTUATOR_LIMITS: Self = Self::from_bits_retain(0x3F00);

    /// Build a mask from a list of bit positions. Positions >= 32 are ignored.
    pub fn from_line_bits(bits: &[u8]) -> Self {
        bits.iter()
            .filter(|&&b| b < 32)
            .fold(Self::empty(), |mask, &b| mask | Self::from_bits_retain(1 << b))
    }

    /// Iterate over the bit positions set in this mask, lowest first.
    pub fn line_bits(self) -> impl Iterator<Item = u8> {
        let raw = self.bits();
        (0..32u8).filter(move |b| raw & (1 << b) != 0)
    }
}

/// Reconstruct an absolute tick count from an overflow count and a raw counter.
///
/// `absolute = overflow * 2^32 + raw`.
#[inline]
pub const fn absolute_ticks(clock_overflow: u32, clock: u32) -> u64 {
    ((clock_overflow as u64) << 32) | clock as u64
}

/// One limit observation: the plain-value image of a packet slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LimitPacket {
    /// Magic header, [`LIMIT_HEADER`] for a valid packet.
    pub header: u32,
    /// Raw hardware counter at sample time.
    pub clock: u32,
    /// Overflow count at sample time, status bit folded in.
    pub clock_overflow: u32,
    /// Active-line bitmask.
    pub state: u32,
}

impl LimitPacket {
    /// Build a packet carrying the standard header.
    pub const fn new(clock: u32, clock_overflow: u32, state: LineMask) -> Self {
        Self {
            header: LIMIT_HEADER,
            clock,
            clock_overflow,
            state: state.bits(),
        }
    }

    /// Whether the header carries the expected magic value.
    #[inline]
    pub const fn is_header_valid(&self) -> bool {
        self.header == LIMIT_HEADER
    }

    /// Reconstructed absolute tick count of this sample.
    #[inline]
    pub const fn absolute_ticks(&self) -> u64 {
        absolute_ticks(self.clock_overflow, self.clock)
    }

    /// Active lines as a mask.
    #[inline]
    pub const fn lines(&self) -> LineMask {
        LineMask::from_bits_retain(self.state)
    }

    /// 16-byte little-endian image, identical to the slot's bytes in shared RAM.
    pub fn to_le_bytes(&self) -> [u8; PACKET_SIZE] {
        let mut out = [0u8; PACKET_SIZE];
        for (chunk, word) in out
            .chunks_exact_mut(4)
            .zip([self.header, self.clock, self.clock_overflow, self.state])
        {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }

    /// Parse a 16-byte little-endian slot image.
    pub fn from_le_bytes(bytes: &[u8; PACKET_SIZE]) -> Self {
        let word = |i: usize| {
            u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]])
        };
        Self {
            header: word(0),
            clock: word(4),
            clock_overflow: word(8),
            state: word(12),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_ticks_spans_overflow() {
        assert_eq!(absolute_ticks(0, 100), 100);
        assert_eq!(absolute_ticks(1, 0), 1u64 << 32);
        assert_eq!(absolute_ticks(2, 5), (2u64 << 32) + 5);
        assert!(absolute_ticks(0, u32::MAX) < absolute_ticks(1, 0));
    }

    #[test]
    fn new_packet_has_valid_header() {
        let packet = LimitPacket::new(100, 0, LineMask::from_bits_retain(1));
        assert!(packet.is_header_valid());
        assert_eq!(packet.header, 0xF00D);
        assert_eq!(packet.state, 1);
        assert!(!LimitPacket::default().is_header_valid());
    }

    #[test]
    fn wire_image_is_little_endian() {
        let packet = LimitPacket::new(0x0102_0304, 7, LineMask::ACTUATOR_1_COLD);
        let bytes = packet.to_le_bytes();
        assert_eq!(&bytes[0..4], &[0x0D, 0xF0, 0x00, 0x00]);
        assert_eq!(&bytes[4..8], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[12..16], &[0x00, 0x01, 0x00, 0x00]);
        assert_eq!(LimitPacket::from_le_bytes(&bytes), packet);
    }

    #[test]
    fn line_mask_from_bits() {
        let mask = LineMask::from_line_bits(&[8, 9, 10, 11, 12, 13]);
        assert_eq!(mask, LineMask::ACTUATOR_LIMITS);
        assert_eq!(mask.bits(), 0x3F00);
        assert_eq!(LineMask::from_line_bits(&[0, 40]).bits(), 1);
    }

    #[test]
    fn line_mask_iterates_bits() {
        let mask = LineMask::ACTUATOR_1_COLD | LineMask::ACTUATOR_3_WARM;
        let bits: Vec<u8> = mask.line_bits().collect();
        assert_eq!(bits, vec![8, 13]);
    }
}
