// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Translation of partition attributes into PMSAv7 region attribute words.
//!
//! A partition carries a [`RegionAttr`]: the access permission, execute-never
//! and memory type bits of MPU_RASR. The region manager adds the SIZE field
//! for the partition's length with [`region_attr`], producing the
//! [`HwRegionAttr`] that is written to the hardware.

use kernel::utilities::math;

use super::registers::RegionAttributes;

/// Access permissions encoded in RASR.AP.
pub use super::registers::RegionAttributes::AP::Value as AccessPermission;

/// Smallest region the PMSAv7 MPU can describe, in bytes.
pub const MIN_REGION_SIZE: u32 = 32;

/// RASR.SIZE of a 32 byte region.
pub const SIZE_FIELD_32B: u32 = 4;

/// RASR.SIZE of a region covering the whole 4 GB address space.
pub const SIZE_FIELD_4GB: u32 = 31;

/// Memory type and cache policy, encoded in RASR.TEX, S, C and B.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemoryType {
    /// All accesses complete in program order. Always shareable.
    StronglyOrdered,
    /// Device memory shared between bus masters.
    DeviceShareable,
    /// Device memory private to this core.
    DeviceNonShareable,
    /// Normal memory, outer and inner write-through, no write allocate.
    WriteThrough { shareable: bool },
    /// Normal memory, outer and inner write-back, no write allocate.
    WriteBack { shareable: bool },
    /// Normal memory, outer and inner write-back, write and read allocate.
    WriteBackAllocate { shareable: bool },
    /// Normal memory, outer and inner non-cacheable.
    NonCacheable { shareable: bool },
}

const fn shareable_bit(shareable: bool) -> u32 {
    if shareable {
        RegionAttributes::S::SET.value
    } else {
        0
    }
}

impl MemoryType {
    /// The TEX, S, C and B bits of this memory type.
    pub const fn bits(self) -> u32 {
        let c = RegionAttributes::C::SET.value;
        let b = RegionAttributes::B::SET.value;
        match self {
            MemoryType::StronglyOrdered => {
                RegionAttributes::TEX::Tex000.value | RegionAttributes::S::SET.value
            }
            MemoryType::DeviceShareable => {
                RegionAttributes::TEX::Tex000.value | b | RegionAttributes::S::SET.value
            }
            MemoryType::DeviceNonShareable => RegionAttributes::TEX::Tex010.value,
            MemoryType::WriteThrough { shareable } => {
                RegionAttributes::TEX::Tex000.value | c | shareable_bit(shareable)
            }
            MemoryType::WriteBack { shareable } => {
                RegionAttributes::TEX::Tex000.value | c | b | shareable_bit(shareable)
            }
            MemoryType::WriteBackAllocate { shareable } => {
                RegionAttributes::TEX::Tex001.value | c | b | shareable_bit(shareable)
            }
            MemoryType::NonCacheable { shareable } => {
                RegionAttributes::TEX::Tex001.value | shareable_bit(shareable)
            }
        }
    }
}

const TYPE_MASK: u32 = RegionAttributes::TEX.mask << RegionAttributes::TEX.shift
    | RegionAttributes::S::SET.value
    | RegionAttributes::C::SET.value
    | RegionAttributes::B::SET.value;

/// Partition attributes: everything in MPU_RASR except SIZE, SRD and ENABLE.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegionAttr {
    rasr: u32,
}

impl RegionAttr {
    /// No access from either privilege level.
    pub const P_NA_U_NA: RegionAttr = RegionAttr::new(
        AccessPermission::NoAccess,
        false,
        MemoryType::WriteBackAllocate { shareable: false },
    );
    /// Read-write for both privilege levels.
    pub const P_RW_U_RW: RegionAttr = RegionAttr::new(
        AccessPermission::ReadWrite,
        false,
        MemoryType::WriteBackAllocate { shareable: false },
    );
    /// Privileged read-write, user read-only.
    pub const P_RW_U_RO: RegionAttr = RegionAttr::new(
        AccessPermission::UnprivilegedReadOnly,
        false,
        MemoryType::WriteBackAllocate { shareable: false },
    );
    /// Privileged read-write, no user access.
    pub const P_RW_U_NA: RegionAttr = RegionAttr::new(
        AccessPermission::PrivilegedOnly,
        false,
        MemoryType::WriteBackAllocate { shareable: false },
    );
    /// Read-only for both privilege levels.
    pub const P_RO_U_RO: RegionAttr = RegionAttr::new(
        AccessPermission::ReadOnly,
        false,
        MemoryType::WriteBackAllocate { shareable: false },
    );
    /// Privileged read-only, no user access.
    pub const P_RO_U_NA: RegionAttr = RegionAttr::new(
        AccessPermission::PrivilegedOnlyReadOnly,
        false,
        MemoryType::WriteBackAllocate { shareable: false },
    );
    /// Read-write-execute for both privilege levels.
    pub const P_RWX_U_RWX: RegionAttr = RegionAttr::new(
        AccessPermission::ReadWrite,
        true,
        MemoryType::WriteBackAllocate { shareable: false },
    );
    /// Privileged read-write-execute, user read-execute.
    pub const P_RWX_U_RX: RegionAttr = RegionAttr::new(
        AccessPermission::UnprivilegedReadOnly,
        true,
        MemoryType::WriteBackAllocate { shareable: false },
    );
    /// Read-execute for both privilege levels.
    pub const P_RX_U_RX: RegionAttr = RegionAttr::new(
        AccessPermission::ReadOnly,
        true,
        MemoryType::WriteBackAllocate { shareable: false },
    );

    pub const fn new(ap: AccessPermission, executable: bool, memory: MemoryType) -> RegionAttr {
        let xn = if executable {
            RegionAttributes::XN::Execute.value
        } else {
            RegionAttributes::XN::ExecuteNever.value
        };
        RegionAttr {
            rasr: ((ap as u32) << RegionAttributes::AP.shift) | xn | memory.bits(),
        }
    }

    /// The same permissions with a different memory type, for example
    /// `P_RW_U_RW.with_memory_type(MemoryType::NonCacheable { shareable: true })`
    /// for buffers shared with a DMA engine.
    pub const fn with_memory_type(self, memory: MemoryType) -> RegionAttr {
        RegionAttr {
            rasr: (self.rasr & !TYPE_MASK) | memory.bits(),
        }
    }

    pub fn access_permission(&self) -> AccessPermission {
        access_permission_of(self.rasr)
    }

    /// Whether either privilege level may write.
    pub fn is_writable(&self) -> bool {
        matches!(
            self.access_permission(),
            AccessPermission::PrivilegedOnly
                | AccessPermission::UnprivilegedReadOnly
                | AccessPermission::ReadWrite
        )
    }

    pub fn is_executable(&self) -> bool {
        self.rasr & RegionAttributes::XN::ExecuteNever.value == 0
    }

    pub const fn bits(&self) -> u32 {
        self.rasr
    }
}

/// The full attribute word of a region: [`RegionAttr`] plus RASR.SIZE.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HwRegionAttr {
    rasr: u32,
}

impl HwRegionAttr {
    pub const fn bits(&self) -> u32 {
        self.rasr
    }

    pub fn size_field(&self) -> u32 {
        (self.rasr >> RegionAttributes::SIZE.shift) & RegionAttributes::SIZE.mask
    }
}

pub(crate) fn access_permission_of(rasr: u32) -> AccessPermission {
    match (rasr >> RegionAttributes::AP.shift) & RegionAttributes::AP.mask {
        0b000 => AccessPermission::NoAccess,
        0b001 => AccessPermission::PrivilegedOnly,
        0b010 => AccessPermission::UnprivilegedReadOnly,
        0b011 => AccessPermission::ReadWrite,
        0b100 => AccessPermission::Reserved,
        0b101 => AccessPermission::PrivilegedOnlyReadOnly,
        0b110 => AccessPermission::ReadOnly,
        _ => AccessPermission::ReadOnlyAlias,
    }
}

/// RASR.SIZE for the smallest region that covers `size` bytes.
///
/// Sizes that are not a power of two round up to the next one. Anything up
/// to 32 bytes uses the 32 byte encoding and anything above 2 GB the 4 GB
/// encoding.
#[cfg_attr(
    feature = "flux",
    flux_rs::sig(fn(size: u32) -> u32{r: r >= 4 && r <= 31})
)]
pub fn size_to_rasr_size(size: u32) -> u32 {
    if size <= MIN_REGION_SIZE {
        return SIZE_FIELD_32B;
    }
    if size > 1 << 31 {
        return SIZE_FIELD_4GB;
    }
    math::ceil_log_base_two(size) - 1
}

/// Size in bytes of a region whose RASR.SIZE is `size_field`.
pub fn region_size_from_field(size_field: u32) -> u64 {
    1u64 << (size_field + 1)
}

/// Attribute word for a region holding `attr` over `size` bytes.
///
/// PMSAv7 attributes do not depend on the base address; it is accepted so
/// callers look the same across MPU versions.
pub fn region_attr(attr: RegionAttr, _base: u32, size: u32) -> HwRegionAttr {
    HwRegionAttr {
        rasr: attr.bits() | (size_to_rasr_size(size) << RegionAttributes::SIZE.shift),
    }
}

/// Kinds of memory a board can describe with memory attributes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemoryKind {
    /// Cacheable RAM.
    Ram,
    /// RAM that must bypass the data cache.
    RamNoCache,
    Flash,
    /// Private peripheral bus.
    Ppb,
    /// Memory mapped peripherals.
    Io,
    /// External memory, inaccessible until a driver maps it.
    ExtMem,
}

impl MemoryKind {
    /// The attributes used for a region of this kind.
    pub const fn attr(self) -> RegionAttr {
        match self {
            MemoryKind::Ram => RegionAttr::new(
                AccessPermission::PrivilegedOnly,
                false,
                MemoryType::WriteBackAllocate { shareable: false },
            ),
            MemoryKind::RamNoCache => RegionAttr::new(
                AccessPermission::PrivilegedOnly,
                false,
                MemoryType::NonCacheable { shareable: false },
            ),
            MemoryKind::Flash => RegionAttr::new(
                AccessPermission::ReadOnly,
                true,
                MemoryType::WriteThrough { shareable: false },
            ),
            MemoryKind::Ppb => RegionAttr::new(
                AccessPermission::PrivilegedOnly,
                true,
                MemoryType::StronglyOrdered,
            ),
            MemoryKind::Io => RegionAttr::new(
                AccessPermission::PrivilegedOnly,
                false,
                MemoryType::DeviceNonShareable,
            ),
            MemoryKind::ExtMem => RegionAttr::new(
                AccessPermission::NoAccess,
                true,
                MemoryType::StronglyOrdered,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_encoding_rounds_up_to_power_of_two() {
        assert_eq!(size_to_rasr_size(64 * 1024), 15);
        assert_eq!(size_to_rasr_size(4096), 11);
        assert_eq!(size_to_rasr_size(4097), 12);
        assert_eq!(size_to_rasr_size(100_000), 16);
        assert_eq!(size_to_rasr_size(33), 5);
    }

    #[test]
    fn size_encoding_clamps() {
        assert_eq!(size_to_rasr_size(0), SIZE_FIELD_32B);
        assert_eq!(size_to_rasr_size(1), SIZE_FIELD_32B);
        assert_eq!(size_to_rasr_size(32), SIZE_FIELD_32B);
        assert_eq!(size_to_rasr_size(1 << 31), 30);
        assert_eq!(size_to_rasr_size((1 << 31) + 1), SIZE_FIELD_4GB);
        assert_eq!(size_to_rasr_size(u32::MAX), SIZE_FIELD_4GB);
    }

    #[test]
    fn size_encoding_never_shrinks() {
        let mut size = 1u32;
        while size < u32::MAX / 3 {
            let covered = region_size_from_field(size_to_rasr_size(size));
            assert!(covered >= size as u64);
            assert!(covered == 32 || covered < 2 * size as u64);
            size = size * 3 + 1;
        }
    }

    #[test]
    fn presets_encode_permissions() {
        assert_eq!(
            RegionAttr::P_RW_U_RW.access_permission(),
            AccessPermission::ReadWrite
        );
        assert!(!RegionAttr::P_RW_U_RW.is_executable());
        assert!(RegionAttr::P_RX_U_RX.is_executable());
        assert!(RegionAttr::P_RW_U_NA.is_writable());
        assert!(!RegionAttr::P_RO_U_RO.is_writable());
        assert_eq!(RegionAttr::P_NA_U_NA.bits() & (0b111 << 24), 0);
        assert_eq!((RegionAttr::P_RO_U_NA.bits() >> 24) & 0b111, 0b101);
        // XN is bit 28.
        assert_eq!(RegionAttr::P_RW_U_RO.bits() & (1 << 28), 1 << 28);
        assert_eq!(RegionAttr::P_RWX_U_RX.bits() & (1 << 28), 0);
    }

    #[test]
    fn memory_type_replaces_cache_bits_only() {
        let nocache = RegionAttr::P_RW_U_RW.with_memory_type(MemoryType::NonCacheable {
            shareable: true,
        });
        assert_eq!(nocache.access_permission(), AccessPermission::ReadWrite);
        assert!(!nocache.is_executable());
        // TEX=001, S=1, C=0, B=0
        assert_eq!(nocache.bits() & TYPE_MASK, (0b001 << 19) | (1 << 18));

        let wbwa = MemoryType::WriteBackAllocate { shareable: false }.bits();
        assert_eq!(wbwa, (0b001 << 19) | (1 << 17) | (1 << 16));
        assert_eq!(MemoryType::DeviceNonShareable.bits(), 0b010 << 19);
        assert_eq!(MemoryType::StronglyOrdered.bits(), 1 << 18);
    }

    #[test]
    fn region_attr_adds_size_field() {
        let hw = region_attr(RegionAttr::P_RW_U_RW, 0x2000_0000, 1024);
        assert_eq!(hw.size_field(), 9);
        assert_eq!(hw.bits() & !(0x1F << 1), RegionAttr::P_RW_U_RW.bits());
        assert_eq!(region_size_from_field(hw.size_field()), 1024);
    }

    #[test]
    fn memory_kinds() {
        assert_eq!(
            MemoryKind::Flash.attr().access_permission(),
            AccessPermission::ReadOnly
        );
        assert!(MemoryKind::Flash.attr().is_executable());
        assert!(!MemoryKind::Io.attr().is_executable());
        assert_eq!(
            MemoryKind::ExtMem.attr().access_permission(),
            AccessPermission::NoAccess
        );
        assert_eq!(
            MemoryKind::RamNoCache.attr().bits() & TYPE_MASK,
            0b001 << 19
        );
    }
}
