// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2022.

//! Utility functions and macros provided by the kernel crate.

pub mod math;
mod static_ref;

pub use self::static_ref::StaticRef;

/// Re-export the tock-register-interface library.
pub mod registers {
    pub use tock_registers::fields::FieldValue;
    pub use tock_registers::interfaces;
    pub use tock_registers::registers::{ReadOnly, ReadWrite};
    pub use tock_registers::{register_bitfields, LocalRegisterCopy};
}
