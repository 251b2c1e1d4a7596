// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Decoded view of one hardware region.

use core::fmt;

use super::attributes::{self, AccessPermission};
use super::registers::{RegionAttributes, RegionBaseAddress, RegionRegisters};

/// A copy of the registers of one MPU region, as read from the hardware.
#[derive(Copy, Clone)]
pub struct RegionSlot {
    index: usize,
    registers: RegionRegisters,
}

impl RegionSlot {
    pub(crate) fn new(index: usize, registers: RegionRegisters) -> RegionSlot {
        RegionSlot { index, registers }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_enabled(&self) -> bool {
        self.registers.rasr.is_set(RegionAttributes::ENABLE)
    }

    pub fn base(&self) -> u32 {
        self.registers.rbar.read(RegionBaseAddress::ADDR) << RegionBaseAddress::ADDR.shift
    }

    /// Size in bytes. A 4 GB region does not fit in 32 bits.
    pub fn size(&self) -> u64 {
        attributes::region_size_from_field(self.registers.rasr.read(RegionAttributes::SIZE))
    }

    pub fn access_permission(&self) -> AccessPermission {
        attributes::access_permission_of(self.registers.rasr.get())
    }

    pub fn is_executable(&self) -> bool {
        !self.registers.rasr.is_set(RegionAttributes::XN)
    }

    pub fn rasr(&self) -> u32 {
        self.registers.rasr.get()
    }

    /// Whether `[addr, addr + size)` lies entirely inside this region.
    ///
    /// A zero size is checked as a one byte access. A range whose last byte
    /// would wrap past the top of the address space is never contained.
    pub fn contains(&self, addr: u32, size: u32) -> bool {
        let last = match addr.checked_add(size.saturating_sub(1)) {
            Some(last) => last,
            None => return false,
        };
        let start = self.base() as u64;
        let end = start + self.size() - 1;
        addr as u64 >= start && last as u64 <= end
    }

    /// Whether user mode may access this region for writing (`write`) or
    /// reading.
    pub fn is_user_accessible(&self, write: bool) -> bool {
        let ap = self.access_permission();
        if write {
            return ap == AccessPermission::ReadWrite;
        }
        matches!(
            ap,
            AccessPermission::ReadWrite
                | AccessPermission::UnprivilegedReadOnly
                | AccessPermission::ReadOnly
                | AccessPermission::ReadOnlyAlias
        )
    }
}

impl fmt::Display for RegionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_enabled() {
            return write!(f, "\r\n  Region {}: Unused", self.index);
        }
        let start = self.base() as u64;
        write!(
            f,
            "\r\n  Region {}: [{:#010X}:{:#010X}], length: {} bytes; {:?}{}",
            self.index,
            start,
            start + self.size(),
            self.size(),
            self.access_permission(),
            if self.is_executable() { "" } else { ", XN" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(base: u32, size_field: u32, ap: u32) -> RegionSlot {
        RegionSlot::new(
            0,
            RegionRegisters::new(base, (ap << 24) | (size_field << 1) | 1),
        )
    }

    #[test]
    fn decodes_base_and_size() {
        let s = slot(0x2000_0000, 9, 0b011);
        assert!(s.is_enabled());
        assert_eq!(s.base(), 0x2000_0000);
        assert_eq!(s.size(), 1024);
        assert_eq!(s.access_permission(), AccessPermission::ReadWrite);
    }

    #[test]
    fn containment_edges() {
        let s = slot(0x2000_0000, 9, 0b011);
        assert!(s.contains(0x2000_0000, 1024));
        assert!(s.contains(0x2000_03FF, 1));
        assert!(s.contains(0x2000_03FF, 0));
        assert!(!s.contains(0x2000_03FF, 2));
        assert!(!s.contains(0x1FFF_FFFF, 2));
    }

    #[test]
    fn whole_address_space_region() {
        let s = slot(0, 31, 0b011);
        assert_eq!(s.size(), 1u64 << 32);
        assert!(s.contains(0xFFFF_FF00, 0x100));
        assert!(!s.contains(0xFFFF_FF00, 0x101));
    }

    #[test]
    fn user_access_rules() {
        assert!(slot(0, 31, 0b011).is_user_accessible(true));
        for ap in [0b010, 0b110, 0b111] {
            assert!(slot(0, 31, ap).is_user_accessible(false));
            assert!(!slot(0, 31, ap).is_user_accessible(true));
        }
        for ap in [0b000, 0b001, 0b101] {
            assert!(!slot(0, 31, ap).is_user_accessible(false));
        }
    }
}
