//! Raw access to memory-mapped registers
//!
//! The driver never dereferences register addresses itself. It asks a
//! [`HardwareAccessPort`] to perform 32 bit reads and writes, which keeps the
//! register model independent of how (and where) the peripheral is mapped.

use core::ptr::{read_volatile, write_volatile};

/// 32 bit register access at an address
///
/// Accesses are assumed to always succeed. There is no recovery strategy for
/// a register that cannot be reached, so an implementation that can fail
/// should treat that as fatal rather than report it.
pub trait HardwareAccessPort {
    /// Read the register at `address`.
    fn read32(&mut self, address: usize) -> u32;

    /// Write `value` to the register at `address`.
    fn write32(&mut self, address: usize, value: u32);
}

impl<T: HardwareAccessPort + ?Sized> HardwareAccessPort for &mut T {
    #[inline]
    fn read32(&mut self, address: usize) -> u32 {
        (**self).read32(address)
    }

    #[inline]
    fn write32(&mut self, address: usize, value: u32) {
        (**self).write32(address, value)
    }
}

/// Volatile pointer access, with an optional offset applied to every address
///
/// With an offset of 0 the register addresses are used as-is, which is the
/// case on bare metal or with an identity mapping. When the register page has
/// been mapped elsewhere (for example with `mmap` of `/dev/mem`), pass the
/// difference between the virtual and the physical base.
#[derive(Debug)]
pub struct Mmio {
    offset: usize,
}

impl Mmio {
    /// Access registers at their physical addresses
    ///
    /// # Safety
    ///
    /// Every address handed to [`HardwareAccessPort::read32`] or
    /// [`HardwareAccessPort::write32`] must be valid for volatile 32 bit
    /// access, in addition to the requirements of
    /// [core::ptr::read_volatile] and [core::ptr::write_volatile].
    #[inline]
    pub const unsafe fn new() -> Self {
        Mmio { offset: 0 }
    }

    /// Access registers through a mapping displaced by `offset` bytes
    ///
    /// # Safety
    ///
    /// `address + offset` (wrapping) must be valid for volatile 32 bit access
    /// for every address used by the driver.
    #[inline]
    pub const unsafe fn with_offset(offset: usize) -> Self {
        Mmio { offset }
    }

    #[inline]
    fn ptr(&self, address: usize) -> *mut u32 {
        address.wrapping_add(self.offset) as *mut u32
    }
}

impl HardwareAccessPort for Mmio {
    #[inline]
    fn read32(&mut self, address: usize) -> u32 {
        // Validity of the address is guaranteed by the constructor contract.
        unsafe { read_volatile(self.ptr(address)) }
    }

    #[inline]
    fn write32(&mut self, address: usize, value: u32) {
        unsafe { write_volatile(self.ptr(address), value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_writes_through_offset() {
        let mut backing = [0u32; 4];
        let base = backing.as_mut_ptr() as usize;
        // Pretend the block lives at physical 0x1000.
        let mut mmio = unsafe { Mmio::with_offset(base.wrapping_sub(0x1000)) };

        mmio.write32(0x1004, 0xdead_beef);
        assert_eq!(mmio.read32(0x1004), 0xdead_beef);
        assert_eq!(mmio.read32(0x1000), 0);
        assert_eq!(backing[1], 0xdead_beef);
    }

    fn bump<P: HardwareAccessPort>(mut port: P) {
        let value = port.read32(0);
        port.write32(0, value + 2);
    }

    #[test]
    fn mutable_reference_forwards() {
        let mut backing = [7u32; 1];
        let base = backing.as_mut_ptr() as usize;
        let mut mmio = unsafe { Mmio::with_offset(base) };

        bump(&mut mmio);
        bump(&mut mmio);
        assert_eq!(backing[0], 11);
    }
}
