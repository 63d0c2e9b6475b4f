//! IEP (Industrial Ethernet Peripheral) timer register block.
//!
//! The IEP counter is the 32-bit, 200 MHz free-running clock shared by both
//! co-processors. Only the four registers the sampler touches are modelled.
//!
//! | Offset | Register       | Use                                      |
//! |--------|----------------|------------------------------------------|
//! | `0x00` | `TMR_GLB_CFG`  | counter enable + default increment       |
//! | `0x04` | `TMR_GLB_STS`  | overflow flag, write 1 to clear          |
//! | `0x08` | `TMR_COMPEN`   | compensation counter, 0 = disabled       |
//! | `0x0C` | `TMR_CNT`      | counter value                            |

use crate::hw::HardwareTimer;
use bitflags::bitflags;
use core::cell::UnsafeCell;
use core::mem::offset_of;
use static_assertions::const_assert_eq;

bitflags! {
    /// `TMR_GLB_CFG` fields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GlobalConfig: u32 {
        /// Counter enable.
        const CNT_ENABLE = 1 << 0;
        /// Default increment of 1 per cycle (bits 4..7 = 1).
        const DEFAULT_INC_1 = 1 << 4;
    }
}

bitflags! {
    /// `TMR_GLB_STS` fields.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GlobalStatus: u32 {
        /// Counter overflowed. Write 1 to clear.
        const CNT_OVF = 1 << 0;
    }
}

/// One memory-mapped 32-bit register. Every access is a volatile load/store.
///
/// Outside test builds a `Register` can only be reached through an
/// `at_address` block, i.e. device memory whose concurrent word accesses are
/// arbitrated by the bus rather than by the Rust memory model.
#[repr(transparent)]
pub struct Register(UnsafeCell<u32>);

// SAFETY: only constructible in place over device memory (see `at_address`);
// test-only blocks are never shared across threads.
unsafe impl Sync for Register {}

impl Register {
    /// A register holding `value`, for off-target register blocks.
    #[cfg(test)]
    pub(crate) const fn new(value: u32) -> Self {
        Self(UnsafeCell::new(value))
    }

    /// Volatile read.
    #[inline]
    pub fn read(&self) -> u32 {
        // SAFETY: the cell is valid for the lifetime of &self.
        unsafe { core::ptr::read_volatile(self.0.get()) }
    }

    /// Volatile write.
    #[inline]
    pub fn write(&self, value: u32) {
        // SAFETY: the cell is valid for the lifetime of &self.
        unsafe { core::ptr::write_volatile(self.0.get(), value) }
    }
}

/// IEP timer registers, `#[repr(C)]` at their hardware offsets.
#[repr(C)]
pub struct IepRegisters {
    /// `TMR_GLB_CFG`
    pub global_cfg: Register,
    /// `TMR_GLB_STS`
    pub global_status: Register,
    /// `TMR_COMPEN`
    pub compensation: Register,
    /// `TMR_CNT`
    pub count: Register,
}

const_assert_eq!(offset_of!(IepRegisters, global_cfg), 0x00);
const_assert_eq!(offset_of!(IepRegisters, global_status), 0x04);
const_assert_eq!(offset_of!(IepRegisters, compensation), 0x08);
const_assert_eq!(offset_of!(IepRegisters, count), 0x0C);

impl IepRegisters {
    /// A zeroed block, for off-target use.
    #[cfg(test)]
    pub(crate) const fn new() -> Self {
        Self {
            global_cfg: Register::new(0),
            global_status: Register::new(0),
            compensation: Register::new(0),
            count: Register::new(0),
        }
    }

    /// The register block at a fixed physical address.
    ///
    /// # Safety
    ///
    /// `address` must be the base of a mapped IEP block that stays valid for
    /// the rest of the program. Ordinary RAM does not qualify: nothing
    /// synchronizes plain memory written through these registers.
    pub unsafe fn at_address(address: usize) -> &'static Self {
        // SAFETY: upheld by the caller.
        unsafe { &*(address as *const Self) }
    }
}

/// [`HardwareTimer`] over an IEP register block.
pub struct IepTimer<'r> {
    regs: &'r IepRegisters,
}

impl<'r> IepTimer<'r> {
    /// Wrap a register block.
    pub fn new(regs: &'r IepRegisters) -> Self {
        Self { regs }
    }
}

impl HardwareTimer for IepTimer<'_> {
    fn configure(&mut self) {
        self.regs.global_status.write(GlobalStatus::CNT_OVF.bits());
        self.regs
            .global_cfg
            .write((GlobalConfig::CNT_ENABLE | GlobalConfig::DEFAULT_INC_1).bits());
        self.regs.compensation.write(0);
    }

    #[inline]
    fn count(&self) -> u32 {
        self.regs.count.read()
    }

    #[inline]
    fn overflow_pending(&self) -> bool {
        GlobalStatus::from_bits_truncate(self.regs.global_status.read())
            .contains(GlobalStatus::CNT_OVF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_writes_reference_values() {
        let regs = IepRegisters::new();
        regs.compensation.write(0xDEAD);
        let mut timer = IepTimer::new(&regs);
        timer.configure();

        assert_eq!(regs.global_cfg.read(), 0x11);
        // Write-1-to-clear: the block records the clearing write.
        assert_eq!(regs.global_status.read(), 1);
        assert_eq!(regs.compensation.read(), 0);
    }

    #[test]
    fn reads_counter_and_status() {
        let regs = IepRegisters::new();
        let timer = IepTimer::new(&regs);

        regs.count.write(0xFFFF_FFF0);
        assert_eq!(timer.count(), 0xFFFF_FFF0);

        assert!(!timer.overflow_pending());
        regs.global_status.write(1);
        assert!(timer.overflow_pending());
    }

    #[test]
    fn register_block_is_word_sized() {
        assert_eq!(core::mem::size_of::<IepRegisters>(), 16);
    }
}
