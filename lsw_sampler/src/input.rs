//! Input sampler: active-line detection on the raw input register.

use crate::hw::InputPort;
use lsw_common::LineMask;

/// Computes the active-line mask from an active-low input register.
///
/// No debounce logic lives here; the dead-time after each publish is the
/// only debounce. Lines asserted together come back as one combined mask.
#[derive(Debug, Clone, Copy)]
pub struct InputSampler {
    mask: LineMask,
}

impl InputSampler {
    /// Monitor the lines in `mask`.
    pub const fn new(mask: LineMask) -> Self {
        Self { mask }
    }

    /// Monitored lines.
    pub const fn mask(&self) -> LineMask {
        self.mask
    }

    /// Active lines in a raw register value.
    #[inline]
    pub const fn active(&self, raw: u32) -> LineMask {
        LineMask::from_bits_retain(!raw & self.mask.bits())
    }

    /// Read the port once. `Some` when at least one monitored line is asserted.
    #[inline]
    pub fn poll<P: InputPort>(&self, port: &mut P) -> Option<LineMask> {
        let active = self.active(port.read());
        (!active.is_empty()).then_some(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPort(u32);

    impl InputPort for FixedPort {
        fn read(&mut self) -> u32 {
            self.0
        }
    }

    #[test]
    fn idle_register_has_no_active_lines() {
        let sampler = InputSampler::new(LineMask::ACTUATOR_LIMITS);
        assert_eq!(sampler.poll(&mut FixedPort(u32::MAX)), None);
    }

    #[test]
    fn asserted_line_reads_low() {
        let sampler = InputSampler::new(LineMask::ACTUATOR_LIMITS);
        let raw = !(1u32 << 9);
        assert_eq!(
            sampler.poll(&mut FixedPort(raw)),
            Some(LineMask::ACTUATOR_1_WARM)
        );
    }

    #[test]
    fn simultaneous_lines_combine() {
        let sampler = InputSampler::new(LineMask::ACTUATOR_LIMITS);
        let raw = !((1u32 << 8) | (1 << 12));
        assert_eq!(
            sampler.poll(&mut FixedPort(raw)),
            Some(LineMask::ACTUATOR_1_COLD | LineMask::ACTUATOR_3_COLD)
        );
    }

    #[test]
    fn unmonitored_lines_are_ignored() {
        let sampler = InputSampler::new(LineMask::ACTUATOR_LIMITS);
        // Bits 0..7 low (encoder lines), limit bits high.
        assert_eq!(sampler.poll(&mut FixedPort(!0xFF)), None);
    }
}
