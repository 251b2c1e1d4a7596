// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! In-memory MPU register file for host tests.

use core::cell::Cell;

use kernel::utilities::registers::{FieldValue, LocalRegisterCopy};

use super::registers::{Control, RegionBaseAddress, RegionRegisters, RegisterAccess, Type};

/// Behaves like the hardware: one region-number latch in front of banked
/// RBAR/RASR pairs. Selecting a region the core does not implement panics.
pub(crate) struct FakeMpu {
    dregion: u8,
    ctrl: Cell<u32>,
    rnr: Cell<u8>,
    rbar: [Cell<u32>; 16],
    rasr: [Cell<u32>; 16],
    region_writes: Cell<usize>,
}

impl FakeMpu {
    pub(crate) fn new(dregion: u8) -> FakeMpu {
        assert!(dregion <= 16);
        FakeMpu {
            dregion,
            ctrl: Cell::new(0),
            rnr: Cell::new(0),
            rbar: Default::default(),
            rasr: Default::default(),
            region_writes: Cell::new(0),
        }
    }

    /// RBAR and RASR of `index`, bypassing the latch.
    pub(crate) fn raw(&self, index: usize) -> (u32, u32) {
        (self.rbar[index].get(), self.rasr[index].get())
    }

    /// Number of region register writes so far.
    pub(crate) fn region_writes(&self) -> usize {
        self.region_writes.get()
    }

    /// Program a region directly, as a bootloader would have left it.
    pub(crate) fn preload(&self, index: usize, rbar: u32, rasr: u32) {
        self.rbar[index].set(rbar & (RegionBaseAddress::ADDR.mask << RegionBaseAddress::ADDR.shift));
        self.rasr[index].set(rasr);
    }
}

impl RegisterAccess for FakeMpu {
    fn mpu_type(&self) -> LocalRegisterCopy<u32, Type::Register> {
        LocalRegisterCopy::new((self.dregion as u32) << Type::DREGION.shift)
    }

    fn control(&self) -> LocalRegisterCopy<u32, Control::Register> {
        LocalRegisterCopy::new(self.ctrl.get())
    }

    fn write_control(&self, value: FieldValue<u32, Control::Register>) {
        self.ctrl.set(value.value);
    }

    fn select_region(&self, index: u8) {
        assert!(
            index < self.dregion,
            "region {} selected on a {} region MPU",
            index,
            self.dregion
        );
        self.rnr.set(index);
    }

    fn read_current(&self) -> RegionRegisters {
        let (rbar, rasr) = self.raw(self.rnr.get() as usize);
        RegionRegisters::new(rbar | (self.rnr.get() as u32 & 0xF), rasr)
    }

    fn write_current(&self, region: RegionRegisters) {
        if region.rbar.is_set(RegionBaseAddress::VALID) {
            self.select_region(region.rbar.read(RegionBaseAddress::REGION) as u8);
        }
        let index = self.rnr.get() as usize;
        self.preload(index, region.rbar.get(), region.rasr.get());
        self.region_writes.set(self.region_writes.get() + 1);
    }
}
