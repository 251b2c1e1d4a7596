// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! PMSAv7 MPU register file and the access seam used by the region manager.

use kernel::utilities::registers::interfaces::{Readable, Writeable};
use kernel::utilities::registers::{
    register_bitfields, FieldValue, LocalRegisterCopy, ReadOnly, ReadWrite,
};
use kernel::utilities::StaticRef;

/// MPU Registers for the Cortex-M0+, Cortex-M3, Cortex-M4 and Cortex-M7
/// families. Described in section 4.5 of
/// <http://infocenter.arm.com/help/topic/com.arm.doc.dui0553a/DUI0553A_cortex_m4_dgug.pdf>
#[repr(C)]
pub struct MpuRegisters {
    /// Indicates whether the MPU is present and, if so, how many regions it
    /// supports.
    pub mpu_type: ReadOnly<u32, Type::Register>,

    /// The control register:
    ///   * Enables the MPU (bit 0).
    ///   * Enables MPU in hard-fault, non-maskable interrupt (NMI).
    ///   * Enables the default memory map background region in privileged mode.
    pub ctrl: ReadWrite<u32, Control::Register>,

    /// Selects the region number (zero-indexed) referenced by the region base
    /// address and region attribute and size registers.
    pub rnr: ReadWrite<u32, RegionNumber::Register>,

    /// Defines the base address of the currently selected MPU region.
    pub rbar: ReadWrite<u32, RegionBaseAddress::Register>,

    /// Defines the region size and memory attributes of the selected MPU
    /// region. The bits are defined as in 4.5.5 of the Cortex-M4 user guide.
    pub rasr: ReadWrite<u32, RegionAttributes::Register>,
}

register_bitfields![u32,
    pub Type [
        /// The number of MPU instructions regions supported. Always reads 0.
        IREGION OFFSET(16) NUMBITS(8) [],
        /// The number of data regions supported. If this field reads-as-zero the
        /// processor does not implement an MPU
        DREGION OFFSET(8) NUMBITS(8) [],
        /// Indicates whether the processor support unified (0) or separate
        /// (1) instruction and data regions. Always reads 0 on the
        /// Cortex-M4.
        SEPARATE OFFSET(0) NUMBITS(1) []
    ],

    pub Control [
        /// Enables privileged software access to the default
        /// memory map
        PRIVDEFENA OFFSET(2) NUMBITS(1) [],
        /// Enables the operation of MPU during hard fault, NMI,
        /// and FAULTMASK handlers
        HFNMIENA OFFSET(1) NUMBITS(1) [],
        /// Enables the MPU
        ENABLE OFFSET(0) NUMBITS(1) []
    ],

    pub RegionNumber [
        /// Region indicating the MPU region referenced by the MPU_RBAR and
        /// MPU_RASR registers.
        REGION OFFSET(0) NUMBITS(8) []
    ],

    pub RegionBaseAddress [
        /// Base address of the currently selected MPU region.
        ADDR OFFSET(5) NUMBITS(27) [],
        /// MPU Region Number valid bit.
        VALID OFFSET(4) NUMBITS(1) [
            /// Use the base address specified in Region Number Register (RNR)
            UseRNR = 0,
            /// Use the value of the REGION field in this register (RBAR)
            UseRBAR = 1
        ],
        /// Specifies which MPU region to set if VALID is set to 1.
        REGION OFFSET(0) NUMBITS(4) []
    ],

    pub RegionAttributes [
        /// Instruction fetches from the region
        XN OFFSET(28) NUMBITS(1) [
            Execute = 0,
            ExecuteNever = 1
        ],
        /// Defines access permissions
        AP OFFSET(24) NUMBITS(3) [
            //                                 Privileged  Unprivileged
            //                                 Access      Access
            NoAccess = 0b000,               // --          --
            PrivilegedOnly = 0b001,         // RW          --
            UnprivilegedReadOnly = 0b010,   // RW          R-
            ReadWrite = 0b011,              // RW          RW
            Reserved = 0b100,               // undef       undef
            PrivilegedOnlyReadOnly = 0b101, // R-          --
            ReadOnly = 0b110,               // R-          R-
            ReadOnlyAlias = 0b111           // R-          R-
        ],
        /// Type extension; together with S, C and B selects the memory type
        TEX OFFSET(19) NUMBITS(3) [
            Tex000 = 0b000,
            Tex001 = 0b001,
            Tex010 = 0b010
        ],
        /// Shareable
        S OFFSET(18) NUMBITS(1) [],
        /// Cacheable
        C OFFSET(17) NUMBITS(1) [],
        /// Bufferable
        B OFFSET(16) NUMBITS(1) [],
        /// Subregion disable bits
        SRD OFFSET(8) NUMBITS(8) [],
        /// Specifies the region size, being 2^(SIZE+1) (minimum 4)
        SIZE OFFSET(1) NUMBITS(5) [],
        /// Enables the region
        ENABLE OFFSET(0) NUMBITS(1) []
    ]
];

const MPU_BASE_ADDRESS: StaticRef<MpuRegisters> =
    unsafe { StaticRef::new(0xE000ED90 as *const MpuRegisters) };

/// Snapshot of the two registers that describe one region.
#[derive(Copy, Clone)]
pub struct RegionRegisters {
    pub rbar: LocalRegisterCopy<u32, RegionBaseAddress::Register>,
    pub rasr: LocalRegisterCopy<u32, RegionAttributes::Register>,
}

impl RegionRegisters {
    pub fn new(rbar: u32, rasr: u32) -> RegionRegisters {
        RegionRegisters {
            rbar: LocalRegisterCopy::new(rbar),
            rasr: LocalRegisterCopy::new(rasr),
        }
    }
}

/// Access to the MPU register file.
///
/// Region registers are banked behind a single region-number latch: callers
/// select a region, then read or write the current region. The two steps
/// must not be separated by anything else that touches the MPU, see
/// [`crate::support::with_interrupts_disabled`].
pub trait RegisterAccess {
    /// The MPU_TYPE register.
    fn mpu_type(&self) -> LocalRegisterCopy<u32, Type::Register>;

    /// The MPU_CTRL register.
    fn control(&self) -> LocalRegisterCopy<u32, Control::Register>;

    /// Overwrite the MPU_CTRL register.
    fn write_control(&self, value: FieldValue<u32, Control::Register>);

    /// Latch `index` into MPU_RNR.
    fn select_region(&self, index: u8);

    /// Read MPU_RBAR and MPU_RASR of the selected region.
    fn read_current(&self) -> RegionRegisters;

    /// Write MPU_RBAR and MPU_RASR of the selected region.
    fn write_current(&self, region: RegionRegisters);

    /// Disable the selected region by zeroing its MPU_RASR.
    fn clear_current(&self) {
        let mut region = self.read_current();
        region.rasr.set(0);
        self.write_current(region);
    }
}

/// The memory mapped MPU of the running core.
///
/// There should only be one instantiation of this object as it represents
/// real hardware.
pub struct CortexMpuRegisters {
    registers: StaticRef<MpuRegisters>,
}

impl CortexMpuRegisters {
    /// ## Safety
    ///
    /// Only one instance may exist, and only on a core that implements a
    /// PMSAv7 MPU.
    pub const unsafe fn new() -> CortexMpuRegisters {
        CortexMpuRegisters {
            registers: MPU_BASE_ADDRESS,
        }
    }
}

impl RegisterAccess for CortexMpuRegisters {
    fn mpu_type(&self) -> LocalRegisterCopy<u32, Type::Register> {
        self.registers.mpu_type.extract()
    }

    fn control(&self) -> LocalRegisterCopy<u32, Control::Register> {
        self.registers.ctrl.extract()
    }

    fn write_control(&self, value: FieldValue<u32, Control::Register>) {
        self.registers.ctrl.write(value);
    }

    fn select_region(&self, index: u8) {
        self.registers.rnr.write(RegionNumber::REGION.val(index as u32));
    }

    fn read_current(&self) -> RegionRegisters {
        RegionRegisters {
            rbar: self.registers.rbar.extract(),
            rasr: self.registers.rasr.extract(),
        }
    }

    fn write_current(&self, region: RegionRegisters) {
        self.registers.rbar.set(region.rbar.get());
        self.registers.rasr.set(region.rasr.get());
    }

    fn clear_current(&self) {
        self.registers.rasr.set(0);
    }
}
