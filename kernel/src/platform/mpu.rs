// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Interface for configuring the Memory Protection Unit.
//!
//! The MPU owns a small, fixed number of hardware region slots. The first
//! slots hold *static* regions that are programmed once during boot; the
//! remaining slots hold *dynamic* regions that are reprogrammed whenever the
//! active memory domain changes. This module describes that contract in a
//! hardware-independent way.
//!
//! Two collaborators use it:
//!
//! - the boot sequence, which calls [`configure_static_regions_or_halt`]
//!   exactly once before interrupts are enabled, and
//! - the memory-domain code, which sizes its tables with
//!   [`MPU::max_available_dynamic_regions`], installs a domain with
//!   [`configure_dynamic_regions_or_halt`] and checks user pointers with
//!   [`MPU::buffer_validate`].
//!
//! Allocation failures are reported as [`MpuError`] so implementations stay
//! testable, but neither caller can recover from them: a partially applied
//! memory map has no rollback path. The `*_or_halt` helpers turn any error
//! into a panic after logging it.

use core::fmt;

use log::error;

/// A contiguous range of memory together with the access attributes the MPU
/// must enforce on it.
///
/// The attribute type is architecture specific; the kernel treats it as
/// opaque. A partition with a size of zero is a placeholder and never
/// consumes a hardware region.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MemoryPartition<A> {
    /// The memory address where the partition starts.
    start: u32,
    /// The number of bytes covered by the partition.
    size: u32,
    /// Access and caching attributes.
    attr: A,
}

impl<A: Copy> MemoryPartition<A> {
    /// Create a new partition with a given start address, length in bytes
    /// and attributes.
    pub const fn new(start: u32, size: u32, attr: A) -> MemoryPartition<A> {
        MemoryPartition { start, size, attr }
    }

    /// Getter: retrieve the address of the start of the partition.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Getter: retrieve the length of the partition in bytes.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn attr(&self) -> A {
        self.attr
    }

    /// Replace the access attributes. The position of the partition never
    /// changes once it has been created.
    pub fn set_attr(&mut self, attr: A) {
        self.attr = attr;
    }

    /// Whether this is a placeholder entry that maps nothing.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Result of checking whether user mode may access a buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied,
}

impl AccessDecision {
    pub fn is_granted(self) -> bool {
        self == AccessDecision::Granted
    }
}

/// Errors reported by MPU region allocation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MpuError {
    /// The requested hardware index does not exist: the MPU is out of
    /// protection capacity.
    #[error("failed to allocate MPU region {index}: only {available} regions implemented")]
    OutOfRegions { index: usize, available: usize },

    /// A partition is not a naturally aligned power of two of at least the
    /// minimum region size.
    #[error("partition {index}: sanity check failed")]
    InvalidPartition { index: usize },

    /// No enabled dynamic region matches the partition that was asked to be
    /// updated.
    #[error("memory domain partition {start:#010x} size {size} not found")]
    PartitionNotFound { start: u32, size: u32 },

    /// Static regions can only be configured once.
    #[error("static MPU regions are already configured")]
    StaticRegionsSealed,

    /// The processor does not implement an MPU.
    #[error("MPU not present")]
    NotPresent,
}

/// The generic trait that particular memory protection unit implementations
/// need to implement.
///
/// Implementations own the hardware region file exclusively; callers refer to
/// regions only through the partitions they pass in.
pub trait MPU {
    /// Architecture specific encoding of the access permissions and memory
    /// type of a partition.
    type Attr: Copy + fmt::Debug;

    /// Enables the MPU.
    ///
    /// Privileged code keeps access to the default memory map for every
    /// address not covered by a region.
    fn enable_mpu(&mut self);

    /// Disables the MPU.
    ///
    /// Used around bulk reprogramming and must be paired with a later call to
    /// `enable_mpu`.
    fn disable_mpu(&mut self);

    /// Returns the number of regions implemented by the MPU.
    fn number_total_regions(&self) -> usize;

    /// Returns the number of regions left over for dynamic partitions once
    /// the static regions are in place.
    fn max_available_dynamic_regions(&self) -> usize;

    /// Programs the boot-time memory map.
    ///
    /// Partitions are validated and placed in the order given, above any
    /// regions the MPU driver reserved during its own initialization. The
    /// background range describes the memory the static regions are carved
    /// out of; architectures whose static regions simply overlay a default
    /// map may ignore it.
    ///
    /// Returns the first region index left free for dynamic partitions.
    fn configure_static_mpu_regions(
        &mut self,
        partitions: &[MemoryPartition<Self::Attr>],
        background_start: u32,
        background_end: u32,
    ) -> Result<usize, MpuError>;

    /// Replaces every dynamic region with `partitions`, in order.
    ///
    /// Partitions are not validated here: the memory-domain code checks them
    /// when they are added to a domain. Dynamic regions that are not
    /// reprogrammed are disabled.
    ///
    /// Returns the first region index left unused.
    fn configure_dynamic_mpu_regions(
        &mut self,
        partitions: &[MemoryPartition<Self::Attr>],
    ) -> Result<usize, MpuError>;

    /// Changes the attributes of a partition that is already placed in a
    /// dynamic region, without moving it.
    fn mem_partition_config_update(
        &mut self,
        partition: &mut MemoryPartition<Self::Attr>,
        new_attr: Self::Attr,
    ) -> Result<(), MpuError>;

    /// Checks whether user mode may access `size` bytes starting at `addr`,
    /// for writing if `write` is set and for reading otherwise.
    fn buffer_validate(&self, addr: u32, size: u32, write: bool) -> AccessDecision;
}

/// Implement default MPU trait for unit.
///
/// A platform without an MPU has no regions: only sets made entirely of
/// empty partitions can be configured and no buffer is ever accessible from
/// user mode.
impl MPU for () {
    type Attr = ();

    fn enable_mpu(&mut self) {}

    fn disable_mpu(&mut self) {}

    fn number_total_regions(&self) -> usize {
        0
    }

    fn max_available_dynamic_regions(&self) -> usize {
        0
    }

    fn configure_static_mpu_regions(
        &mut self,
        partitions: &[MemoryPartition<()>],
        _background_start: u32,
        _background_end: u32,
    ) -> Result<usize, MpuError> {
        if partitions.iter().any(|p| !p.is_empty()) {
            return Err(MpuError::OutOfRegions {
                index: 0,
                available: 0,
            });
        }
        Ok(0)
    }

    fn configure_dynamic_mpu_regions(
        &mut self,
        partitions: &[MemoryPartition<()>],
    ) -> Result<usize, MpuError> {
        self.configure_static_mpu_regions(partitions, 0, 0)
    }

    fn mem_partition_config_update(
        &mut self,
        partition: &mut MemoryPartition<()>,
        _new_attr: (),
    ) -> Result<(), MpuError> {
        Err(MpuError::PartitionNotFound {
            start: partition.start(),
            size: partition.size(),
        })
    }

    fn buffer_validate(&self, _addr: u32, _size: u32, _write: bool) -> AccessDecision {
        AccessDecision::Denied
    }
}

/// Program the static memory map, halting on failure.
///
/// An improperly protected boot-time memory map is not something the system
/// may run with, so any error is fatal.
pub fn configure_static_regions_or_halt<M: MPU + ?Sized>(
    mpu: &mut M,
    partitions: &[MemoryPartition<M::Attr>],
    background_start: u32,
    background_end: u32,
) -> usize {
    match mpu.configure_static_mpu_regions(partitions, background_start, background_end) {
        Ok(next_free) => next_free,
        Err(err) => {
            error!(
                "Configuring {} static MPU regions failed: {}",
                partitions.len(),
                err
            );
            panic!("static MPU configuration failed: {}", err);
        }
    }
}

/// Install the dynamic regions of a memory domain, halting on failure.
///
/// Some regions of the new domain may already be programmed when an error
/// is reported and the previous domain's regions are no longer intact, so
/// execution cannot safely continue.
pub fn configure_dynamic_regions_or_halt<M: MPU + ?Sized>(
    mpu: &mut M,
    partitions: &[MemoryPartition<M::Attr>],
) -> usize {
    match mpu.configure_dynamic_mpu_regions(partitions) {
        Ok(next_free) => next_free,
        Err(err) => {
            error!(
                "Configuring {} dynamic MPU regions failed: {}",
                partitions.len(),
                err
            );
            panic!("dynamic MPU configuration failed: {}", err);
        }
    }
}

/// Update the attributes of a placed partition, halting if it is not placed.
///
/// Callers must only update partitions of the active domain; anything else
/// is a kernel bug.
#[cfg(feature = "userspace")]
pub fn update_partition_or_halt<M: MPU + ?Sized>(
    mpu: &mut M,
    partition: &mut MemoryPartition<M::Attr>,
    new_attr: M::Attr,
) {
    if let Err(err) = mpu.mem_partition_config_update(partition, new_attr) {
        error!("{}", err);
        panic!("MPU partition update failed: {}", err);
    }
}
