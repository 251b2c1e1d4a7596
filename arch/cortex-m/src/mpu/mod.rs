// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Implementation of the memory protection unit for the Cortex-M0+, Cortex-M3,
//! Cortex-M4, and Cortex-M7 (PMSAv7).
//!
//! The region file is split in two at a boundary fixed during boot:
//!
//! ```text
//!   0 .. boot            SoC fixed regions and board memory attributes (init)
//!   boot .. static       boot-time memory map (configure_static_mpu_regions)
//!   static .. N          active memory domain (configure_dynamic_mpu_regions)
//! ```
//!
//! On overlapping regions the higher index wins, so every batch is placed in
//! exactly the order the caller gives it.

use core::cell::OnceCell;
use core::fmt;

use kernel::config::CONFIG;
use kernel::platform::mpu::{self, AccessDecision, MemoryPartition, MpuError};
use kernel::utilities::math;
use kernel::utilities::registers::LocalRegisterCopy;
use log::{debug, error, info, warn};

use crate::support;

pub mod attributes;
#[cfg(test)]
mod fake;
mod region;
pub mod registers;

pub use self::attributes::{
    AccessPermission, HwRegionAttr, MemoryKind, MemoryType, RegionAttr, MIN_REGION_SIZE,
};
pub use self::region::RegionSlot;
pub use self::registers::{CortexMpuRegisters, RegisterAccess};

use self::registers::{Control, RegionAttributes, RegionBaseAddress, RegionRegisters, Type};

/// A partition as placed by this MPU.
pub type Partition = MemoryPartition<RegionAttr>;

/// Cortex-M cores with a PMSAv7 MPU.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CortexMVariant {
    CortexM0Plus,
    CortexM3,
    CortexM4,
    CortexM7,
    /// Any other PMSAv7 implementation.
    Other,
}

impl CortexMVariant {
    /// The region count mandated by the core, if the core fixes one.
    pub const fn fixed_region_count(self) -> Option<u8> {
        match self {
            CortexMVariant::CortexM0Plus | CortexMVariant::CortexM3 | CortexMVariant::CortexM4 => {
                Some(8)
            }
            CortexMVariant::CortexM7 | CortexMVariant::Other => None,
        }
    }
}

/// A region the SoC requires at a fixed index from the very first
/// instruction. Programmed as given, without validation.
#[derive(Copy, Clone, Debug)]
pub struct BootRegion {
    pub name: &'static str,
    pub base: u32,
    pub size: u32,
    pub attr: RegionAttr,
}

impl BootRegion {
    pub const fn new(name: &'static str, base: u32, size: u32, attr: RegionAttr) -> BootRegion {
        BootRegion {
            name,
            base,
            size,
            attr,
        }
    }
}

/// A memory range the board tags with a [`MemoryKind`].
#[derive(Copy, Clone, Debug)]
pub struct MemoryAttrRegion {
    pub name: &'static str,
    pub base: u32,
    pub size: u32,
    pub kind: MemoryKind,
}

impl MemoryAttrRegion {
    pub const fn new(name: &'static str, base: u32, size: u32, kind: MemoryKind) -> MemoryAttrRegion {
        MemoryAttrRegion {
            name,
            base,
            size,
            kind,
        }
    }
}

/// Board description of the MPU, usually a `const` in the board crate.
#[derive(Copy, Clone, Debug)]
pub struct MpuConfig<'a> {
    pub cpu: CortexMVariant,
    /// Overrides MPU_TYPE.DREGION unless the core fixes the count.
    pub num_regions: Option<u8>,
    pub boot_regions: &'a [BootRegion],
    pub memory_attr_regions: &'a [MemoryAttrRegion],
}

impl<'a> MpuConfig<'a> {
    pub const fn new(cpu: CortexMVariant) -> MpuConfig<'a> {
        MpuConfig {
            cpu,
            num_regions: None,
            boot_regions: &[],
            memory_attr_regions: &[],
        }
    }
}

/// Number of regions the manager may use.
///
/// A count fixed by the core takes precedence over the board override, which
/// takes precedence over MPU_TYPE.DREGION.
pub fn discover_region_count<R: RegisterAccess>(registers: &R, config: &MpuConfig<'_>) -> u8 {
    if let Some(count) = config.cpu.fixed_region_count() {
        return count;
    }
    if let Some(count) = config.num_regions {
        return count;
    }
    registers.mpu_type().read(Type::DREGION) as u8
}

/// Whether the hardware can describe `partition` exactly: a power of two of
/// at least [`MIN_REGION_SIZE`] bytes, aligned to its own size.
pub fn partition_is_valid(partition: &Partition) -> bool {
    let size = partition.size();
    math::is_power_of_two(size)
        && size >= MIN_REGION_SIZE
        && math::is_aligned(partition.start(), size)
}

/// The PMSAv7 region manager.
///
/// There is one per core. It only exists once `init` has put the unit into
/// a known state, so an uninitialized MPU cannot be configured.
pub struct CortexMpu<R: RegisterAccess = CortexMpuRegisters> {
    registers: R,
    num_regions: u8,
    /// Regions programmed by `init`.
    boot_regions: u8,
    /// First index available to dynamic regions. Set once.
    static_regions: OnceCell<u8>,
}

impl<R: RegisterAccess> CortexMpu<R> {
    /// Bring the MPU into its boot configuration.
    ///
    /// The unit is disabled, the SoC boot regions are programmed from index 0
    /// followed by the memory attribute regions, every remaining region is
    /// disabled, and the unit is enabled again with the default memory map as
    /// privileged background.
    pub fn init(registers: R, config: &MpuConfig<'_>) -> Result<CortexMpu<R>, MpuError> {
        let hw_regions = registers.mpu_type().read(Type::DREGION);
        if hw_regions == 0 {
            error!("MPU not present");
            return Err(MpuError::NotPresent);
        }
        let num_regions = discover_region_count(&registers, config);
        if let Some(fixed) = config.cpu.fixed_region_count() {
            if hw_regions != fixed as u32 {
                warn!(
                    "{:?} reports {} MPU regions, using {}",
                    config.cpu, hw_regions, fixed
                );
            }
        }

        if config.boot_regions.len() > num_regions as usize {
            error!(
                "Request to configure: {} regions (supported: {})",
                config.boot_regions.len(),
                num_regions
            );
            return Err(MpuError::OutOfRegions {
                index: num_regions as usize,
                available: num_regions as usize,
            });
        }

        let mut mpu = CortexMpu {
            registers,
            num_regions,
            boot_regions: 0,
            static_regions: OnceCell::new(),
        };

        mpu.disable();

        for (index, region) in config.boot_regions.iter().enumerate() {
            let attr = attributes::region_attr(region.attr, region.base, region.size);
            mpu.region_init(index, region.base, attr);
        }

        let mut next = config.boot_regions.len();
        for region in config.memory_attr_regions {
            let attr = attributes::region_attr(region.kind.attr(), region.base, region.size);
            next = mpu
                .allocate_and_program(next, region.base, attr)
                .inspect_err(|_| error!("No MPU region left for {}", region.name))?
                + 1;
        }
        mpu.boot_regions = next as u8;

        for index in next..mpu.num_regions as usize {
            mpu.clear_region(index);
        }

        mpu.enable();

        info!(
            "MPU: {} regions, {} programmed at boot",
            mpu.num_regions, mpu.boot_regions
        );
        Ok(mpu)
    }

    /// Program `index` with `attr` at `base` and enable it.
    fn region_init(&self, index: usize, base: u32, attr: HwRegionAttr) {
        let mut rbar = LocalRegisterCopy::<u32, RegionBaseAddress::Register>::new(0);
        rbar.write(
            RegionBaseAddress::ADDR.val(base >> RegionBaseAddress::ADDR.shift)
                + RegionBaseAddress::VALID::UseRNR,
        );
        let region = RegionRegisters {
            rbar,
            rasr: LocalRegisterCopy::new(attr.bits() | RegionAttributes::ENABLE::SET.value),
        };

        support::with_interrupts_disabled(|| {
            self.registers.select_region(index as u8);
            self.registers.write_current(region);
        });

        if CONFIG.debug_mpu {
            debug!(
                "[{}] {:#010x} {:#010x}",
                index,
                region.rbar.get(),
                region.rasr.get()
            );
        }
    }

    /// Program region `index`, failing without touching the hardware if the
    /// MPU does not implement it.
    pub fn allocate_and_program(
        &self,
        index: usize,
        base: u32,
        attr: HwRegionAttr,
    ) -> Result<usize, MpuError> {
        if index >= self.num_regions as usize {
            error!("Failed to allocate new MPU region {}", index);
            return Err(MpuError::OutOfRegions {
                index,
                available: self.num_regions as usize,
            });
        }
        self.region_init(index, base, attr);
        Ok(index)
    }

    /// Place `partition` in region `index`.
    pub fn configure_one_region(
        &self,
        index: usize,
        partition: &Partition,
    ) -> Result<usize, MpuError> {
        let attr = attributes::region_attr(
            partition.attr(),
            partition.start(),
            partition.size(),
        );
        self.allocate_and_program(index, partition.start(), attr)
    }

    /// Place `partitions` in consecutive regions starting at `start_index`,
    /// in the order given. Empty partitions are skipped and use no region.
    ///
    /// Returns the index after the last region programmed. On error the
    /// regions already programmed by this call stay programmed.
    pub fn configure_region_set(
        &self,
        partitions: &[Partition],
        start_index: usize,
        validate: bool,
    ) -> Result<usize, MpuError> {
        let mut next = start_index;
        for (i, partition) in partitions.iter().enumerate() {
            if partition.is_empty() {
                continue;
            }
            if validate && !partition_is_valid(partition) {
                error!("Partition {}: sanity check failed.", i);
                return Err(MpuError::InvalidPartition { index: i });
            }
            next = self.configure_one_region(next, partition)? + 1;
        }
        Ok(next)
    }

    /// Disable region `index`.
    fn clear_region(&self, index: usize) {
        support::with_interrupts_disabled(|| {
            self.registers.select_region(index as u8);
            self.registers.clear_current();
        });
    }

    /// First region index available to dynamic partitions.
    pub fn static_regions_num(&self) -> usize {
        self.static_regions
            .get()
            .copied()
            .unwrap_or(self.boot_regions) as usize
    }

    /// Snapshot of region `index`, or `None` past the last region.
    pub fn region(&self, index: usize) -> Option<RegionSlot> {
        if index >= self.num_regions as usize {
            return None;
        }
        let registers = support::with_interrupts_disabled(|| {
            self.registers.select_region(index as u8);
            self.registers.read_current()
        });
        Some(RegionSlot::new(index, registers))
    }

    /// Whether MPU_CTRL.ENABLE is set.
    pub fn is_enabled(&self) -> bool {
        self.registers.control().is_set(Control::ENABLE)
    }

    /// Enable the MPU with the default memory map as privileged background.
    pub fn enable(&self) {
        self.registers
            .write_control(Control::ENABLE::SET + Control::PRIVDEFENA::SET);
        // Region changes must be visible before the next access, and nothing
        // after this point may have been fetched under the old map.
        support::dsb();
        support::isb();
    }

    /// Disable the MPU once outstanding transfers have completed.
    pub fn disable(&self) {
        support::dmb();
        self.registers.write_control(Control::ENABLE::CLEAR);
    }
}

impl<R: RegisterAccess> fmt::Display for CortexMpu<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\r\n Cortex-M MPU: {} regions, {} static, {}",
            self.num_regions,
            self.static_regions_num(),
            if self.is_enabled() { "enabled" } else { "disabled" }
        )?;
        for index in 0..self.num_regions as usize {
            if let Some(region) = self.region(index) {
                write!(f, "{}", region)?;
            }
        }
        f.write_str("\r\n")
    }
}

impl<R: RegisterAccess> mpu::MPU for CortexMpu<R> {
    type Attr = RegionAttr;

    fn enable_mpu(&mut self) {
        self.enable();
    }

    fn disable_mpu(&mut self) {
        self.disable();
    }

    fn number_total_regions(&self) -> usize {
        self.num_regions as usize
    }

    fn max_available_dynamic_regions(&self) -> usize {
        self.num_regions as usize - self.static_regions_num()
    }

    fn configure_static_mpu_regions(
        &mut self,
        partitions: &[Partition],
        _background_start: u32,
        _background_end: u32,
    ) -> Result<usize, MpuError> {
        // Static regions overlay the default map, no background region needed.
        if self.static_regions.get().is_some() {
            error!("Static MPU regions are already configured");
            return Err(MpuError::StaticRegionsSealed);
        }
        let next = self.configure_region_set(partitions, self.static_regions_num(), true)?;
        self.static_regions
            .set(next as u8)
            .map_err(|_| MpuError::StaticRegionsSealed)?;
        Ok(next)
    }

    fn configure_dynamic_mpu_regions(
        &mut self,
        partitions: &[Partition],
    ) -> Result<usize, MpuError> {
        let next = self.configure_region_set(partitions, self.static_regions_num(), false)?;
        for index in next..self.num_regions as usize {
            self.clear_region(index);
        }
        Ok(next)
    }

    fn mem_partition_config_update(
        &mut self,
        partition: &mut Partition,
        new_attr: RegionAttr,
    ) -> Result<(), MpuError> {
        let start = partition.start();
        let size = partition.size();
        let found = (self.static_regions_num()..self.num_regions as usize).find(|&index| {
            self.region(index).is_some_and(|region| {
                region.is_enabled() && region.base() == start && region.size() == size as u64
            })
        });

        match found {
            Some(index) => {
                partition.set_attr(new_attr);
                self.configure_one_region(index, partition)?;
                Ok(())
            }
            None => {
                error!("Memory domain partition {:#010x} size {} not found", start, size);
                Err(MpuError::PartitionNotFound { start, size })
            }
        }
    }

    fn buffer_validate(&self, addr: u32, size: u32, write: bool) -> AccessDecision {
        support::with_interrupts_disabled(|| {
            for index in (0..self.num_regions as usize).rev() {
                self.registers.select_region(index as u8);
                let region = RegionSlot::new(index, self.registers.read_current());
                if !region.is_enabled() || !region.contains(addr, size) {
                    continue;
                }
                // The highest matching region is the one the hardware uses.
                return if region.is_user_accessible(write) {
                    AccessDecision::Granted
                } else {
                    AccessDecision::Denied
                };
            }
            AccessDecision::Denied
        })
    }
}
