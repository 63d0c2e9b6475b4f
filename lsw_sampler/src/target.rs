//! Reference target board.
//!
//! Binds the sampler to its co-processor: shared RAM and the IEP block at
//! their fixed addresses, the active-low input register, the event output
//! register and a spin-calibrated dead-time. A port's entry point is
//!
//! ```ignore
//! // SAFETY: running on the reference target with its memory map.
//! let sampler = unsafe { reference_sampler(PORTS_ADDRESS) };
//! run_and_halt(sampler, ParkHalt)
//! ```

use crate::control::{Board, LimitSampler, SamplerSettings};
use crate::delay::SpinDelay;
use crate::hw::{Halt, InputPort, SignalLine};
use crate::iep::{IepRegisters, IepTimer, Register};
use core::mem::offset_of;
use lsw_common::SharedMemoryMap;
use lsw_common::consts::{DEFAULT_CLOCK_HZ, IEP_BASE, SHARED_RAM_BASE};
use static_assertions::const_assert_eq;

/// Input and event-output registers, `#[repr(C)]`.
#[repr(C)]
pub struct PortRegisters {
    /// Raw input lines, active low.
    pub input: Register,
    /// Event output. A write raises the pattern toward the host.
    pub event: Register,
}

const_assert_eq!(offset_of!(PortRegisters, input), 0x00);
const_assert_eq!(offset_of!(PortRegisters, event), 0x04);

impl PortRegisters {
    /// A block reading `input`, for off-target use.
    #[cfg(test)]
    pub(crate) const fn new(input: u32) -> Self {
        Self {
            input: Register::new(input),
            event: Register::new(0),
        }
    }

    /// The port block at a fixed physical address.
    ///
    /// # Safety
    ///
    /// Same contract as [`IepRegisters::at_address`].
    pub unsafe fn at_address(address: usize) -> &'static Self {
        // SAFETY: upheld by the caller.
        unsafe { &*(address as *const Self) }
    }
}

/// [`InputPort`] over the input register.
pub struct RegisterInput<'r>(&'r Register);

impl InputPort for RegisterInput<'_> {
    #[inline]
    fn read(&mut self) -> u32 {
        self.0.read()
    }
}

/// [`SignalLine`] over the event register.
pub struct RegisterSignal<'r>(&'r Register);

impl SignalLine for RegisterSignal<'_> {
    fn assert_pattern(&mut self, pattern: u32) {
        self.0.write(pattern);
    }
}

/// Parks the core once the sampler is done.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParkHalt;

impl Halt for ParkHalt {
    fn halt(self) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }
}

/// Hardware seams of the reference target.
pub type TargetBoard<'r> = Board<IepTimer<'r>, RegisterInput<'r>, RegisterSignal<'r>, SpinDelay>;

/// Sampler bound to the reference target for the rest of the program.
pub type TargetSampler =
    LimitSampler<'static, IepTimer<'static>, RegisterInput<'static>, RegisterSignal<'static>, SpinDelay>;

/// Assemble a board from register blocks, dead-time calibrated to `clock_hz`.
pub fn target_board<'r>(iep: &'r IepRegisters, ports: &'r PortRegisters, clock_hz: u64) -> TargetBoard<'r> {
    Board {
        timer: IepTimer::new(iep),
        inputs: RegisterInput(&ports.input),
        signal: RegisterSignal(&ports.event),
        delay: SpinDelay::new(clock_hz),
    }
}

/// The sampler on the reference target with default settings.
///
/// # Safety
///
/// Shared RAM and the IEP block must be mapped at [`SHARED_RAM_BASE`] and
/// [`IEP_BASE`] (see [`SharedMemoryMap::at_address`] and
/// [`IepRegisters::at_address`]), and `ports_address` must satisfy
/// [`PortRegisters::at_address`].
pub unsafe fn reference_sampler(ports_address: usize) -> TargetSampler {
    // SAFETY: upheld by the caller.
    let (map, iep, ports) = unsafe {
        (
            SharedMemoryMap::at_address(SHARED_RAM_BASE),
            IepRegisters::at_address(IEP_BASE),
            PortRegisters::at_address(ports_address),
        )
    };
    LimitSampler::new(map, target_board(iep, ports, DEFAULT_CLOCK_HZ), SamplerSettings::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::Step;
    use crate::delay::DebounceDelay;
    use lsw_common::{LimitPacket, LineMask};
    use std::sync::atomic::Ordering;

    #[test]
    fn register_board_samples_and_signals() {
        let map = SharedMemoryMap::new();
        let iep = IepRegisters::new();
        let ports = PortRegisters::new(!(1 << 11));
        iep.count.write(4_242);
        map.clock_overflow.store(3, Ordering::Release);

        let settings = SamplerSettings {
            debounce: DebounceDelay::from_cycles(10),
            ..SamplerSettings::default()
        };
        let mut sampler = LimitSampler::new(&map, target_board(&iep, &ports, 1_000_000), settings);

        sampler.init();
        assert_eq!(iep.global_cfg.read(), 0x11);
        assert_eq!(iep.compensation.read(), 0);
        // The block keeps the write-1-to-clear value; hardware would drop it.
        assert_eq!(iep.global_status.read(), 1);
        iep.global_status.write(0);

        assert_eq!(
            sampler.step(),
            Step::Published {
                ready: 1,
                packet: LimitPacket::new(4_242, 3, LineMask::ACTUATOR_2_WARM),
            }
        );

        ports.input.write(u32::MAX);
        assert_eq!(sampler.step(), Step::Idle);

        map.run_flag.store(1, Ordering::Release);
        assert_eq!(sampler.step(), Step::StopRequested);
        let report = sampler.complete();
        assert_eq!(ports.event.read(), 0x28);
        assert_eq!(report.published, 1);
    }

    #[test]
    fn port_block_is_two_words() {
        assert_eq!(core::mem::size_of::<PortRegisters>(), 8);
    }
}
